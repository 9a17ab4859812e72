use super::env::Env;
use super::parse::{millis, opt_path, parse_hex_32_csv, parse_tron_address, parse_url};
use super::{AppConfig, FilesConfig, SecretsConfig, StrategyConfig, TokenConfig, TronConfig};
use crate::pacer::PacingConfig;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tron::FeePolicy;

pub(super) fn load_config() -> Result<AppConfig> {
    let env: Env = envy::from_env().context("load manager env config")?;
    build(env)
}

pub(super) fn build(env: Env) -> Result<AppConfig> {
    let api_url = parse_url("TRON_API_URL", &env.tron_api_url)?;
    let api_key = env
        .tron_api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty());
    if api_key.is_none() && api_url.contains("trongrid.io") {
        tracing::warn!("TRON_API_KEY is not set; TronGrid will rate-limit anonymous requests");
    }

    if env.tron_http_timeout_secs == 0 {
        anyhow::bail!("TRON_HTTP_TIMEOUT_SECS must be > 0");
    }
    if env.tron_fee_limit_cap_sun == 0 {
        anyhow::bail!("TRON_FEE_LIMIT_CAP_SUN must be > 0");
    }
    if env.manager_energy_per_transfer == 0 {
        anyhow::bail!("MANAGER_ENERGY_PER_TRANSFER must be > 0");
    }
    if env.tron_usdt_decimals > 30 {
        anyhow::bail!(
            "TRON_USDT_DECIMALS must be <= 30 (got {})",
            env.tron_usdt_decimals
        );
    }

    let history_file = opt_path(&env.manager_history_file)
        .unwrap_or_else(|| PathBuf::from("transaction_history.json"));

    let symbol = match env.tron_usdt_symbol.trim() {
        "" => "USDT".to_string(),
        s => s.to_string(),
    };

    let private_keys = parse_hex_32_csv(
        "MANAGER_PRIVATE_KEYS_HEX_CSV",
        &env.manager_private_keys_hex_csv,
    )?;

    Ok(AppConfig {
        tron: TronConfig {
            api_url,
            api_key,
            http_timeout: Duration::from_secs(env.tron_http_timeout_secs),
            fee_policy: FeePolicy {
                fee_limit_cap_sun: env.tron_fee_limit_cap_sun,
                fee_limit_headroom_ppm: env.tron_fee_limit_headroom_ppm,
            },
        },
        files: FilesConfig {
            wallet_file: opt_path(&env.manager_wallet_file),
            history_file,
        },
        pacing: PacingConfig {
            settle: millis(env.manager_settle_delay_ms),
            wallet_gap: millis(env.manager_wallet_gap_ms),
            transfer_gap: millis(env.manager_transfer_gap_ms),
            strategy_step: millis(env.manager_step_delay_ms),
            min_submit_interval: millis(env.manager_min_submit_interval_ms),
        },
        strategy: StrategyConfig {
            energy_per_transfer: env.manager_energy_per_transfer,
        },
        token: TokenConfig {
            contract: parse_tron_address("TRON_USDT_CONTRACT", &env.tron_usdt_contract)?,
            decimals: env.tron_usdt_decimals,
            symbol,
            abi_file: opt_path(&env.tron_usdt_abi_file),
        },
        secrets: SecretsConfig { private_keys },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_a_mainnet_config() {
        let cfg = build(Env::default()).unwrap();
        assert_eq!(cfg.tron.api_url, "https://api.trongrid.io");
        assert_eq!(cfg.tron.http_timeout, Duration::from_secs(20));
        assert_eq!(cfg.tron.fee_policy.fee_limit_cap_sun, 10_000_000);
        assert_eq!(cfg.files.wallet_file, None);
        assert_eq!(
            cfg.files.history_file,
            PathBuf::from("transaction_history.json")
        );
        assert_eq!(cfg.pacing, PacingConfig::default());
        assert_eq!(cfg.strategy.energy_per_transfer, 30_000);
        assert_eq!(
            cfg.token.contract.to_base58check(),
            "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t"
        );
        assert!(cfg.secrets.private_keys.is_empty());
    }

    #[test]
    fn blank_api_key_is_none_and_zero_delays_are_allowed() {
        let cfg = build(Env {
            tron_api_key: Some("  ".to_string()),
            manager_settle_delay_ms: 0,
            manager_wallet_gap_ms: 0,
            manager_transfer_gap_ms: 0,
            manager_step_delay_ms: 0,
            manager_min_submit_interval_ms: 0,
            ..Env::default()
        })
        .unwrap();
        assert_eq!(cfg.tron.api_key, None);
        assert_eq!(cfg.pacing, PacingConfig::zero());
    }

    #[test]
    fn rejects_invalid_values() {
        let bad_contract = Env {
            tron_usdt_contract: "not-an-address".to_string(),
            ..Env::default()
        };
        assert!(build(bad_contract).is_err());

        let zero_timeout = Env {
            tron_http_timeout_secs: 0,
            ..Env::default()
        };
        assert!(build(zero_timeout).is_err());

        let bad_keys = Env {
            manager_private_keys_hex_csv: "abcd".to_string(),
            ..Env::default()
        };
        let err = format!("{:#}", build(bad_keys).unwrap_err());
        assert!(err.contains("MANAGER_PRIVATE_KEYS_HEX_CSV"));
    }

    #[test]
    fn secrets_debug_hides_keys() {
        let cfg = build(Env {
            manager_private_keys_hex_csv: "22".repeat(32),
            ..Env::default()
        })
        .unwrap();
        let dbg = format!("{:?}", cfg.secrets);
        assert!(!dbg.contains("2222"));
        assert!(dbg.contains('1'));
    }
}
