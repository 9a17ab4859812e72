use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(super) struct Env {
    pub tron_api_url: String,

    pub tron_api_key: Option<String>,

    pub tron_http_timeout_secs: u64,

    /// Upper bound for TriggerSmartContract `fee_limit` (sun).
    pub tron_fee_limit_cap_sun: u64,

    pub tron_fee_limit_headroom_ppm: u64,

    /// Empty means the profile's default file name.
    pub manager_wallet_file: String,

    pub manager_history_file: String,

    pub manager_settle_delay_ms: u64,

    pub manager_wallet_gap_ms: u64,

    pub manager_transfer_gap_ms: u64,

    pub manager_step_delay_ms: u64,

    pub manager_min_submit_interval_ms: u64,

    /// When set, keys are taken from here instead of the wallet file.
    pub manager_private_keys_hex_csv: String,

    pub manager_energy_per_transfer: u64,

    pub tron_usdt_contract: String,

    pub tron_usdt_decimals: u32,

    pub tron_usdt_symbol: String,

    /// Optional contract ABI JSON used to resolve `transfer` / `balanceOf`.
    pub tron_usdt_abi_file: String,
}

impl Default for Env {
    fn default() -> Self {
        Self {
            tron_api_url: "https://api.trongrid.io".to_string(),
            tron_api_key: None,
            tron_http_timeout_secs: 20,
            tron_fee_limit_cap_sun: 10_000_000,
            tron_fee_limit_headroom_ppm: 200_000,
            manager_wallet_file: String::new(),
            manager_history_file: "transaction_history.json".to_string(),
            manager_settle_delay_ms: 3_000,
            manager_wallet_gap_ms: 5_000,
            manager_transfer_gap_ms: 3_000,
            manager_step_delay_ms: 5_000,
            manager_min_submit_interval_ms: 250,
            manager_private_keys_hex_csv: String::new(),
            manager_energy_per_transfer: 30_000,
            tron_usdt_contract: "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t".to_string(),
            tron_usdt_decimals: 6,
            tron_usdt_symbol: "USDT".to_string(),
            tron_usdt_abi_file: String::new(),
        }
    }
}
