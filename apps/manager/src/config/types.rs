use crate::pacer::PacingConfig;
use std::path::PathBuf;
use std::time::Duration;
use tron::{FeePolicy, TronAddress};

#[derive(Debug, Clone)]
pub struct TronConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub http_timeout: Duration,
    pub fee_policy: FeePolicy,
}

#[derive(Debug, Clone)]
pub struct FilesConfig {
    /// `None` means the profile's default wallet file.
    pub wallet_file: Option<PathBuf>,
    pub history_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub contract: TronAddress,
    pub decimals: u32,
    pub symbol: String,
    pub abi_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
pub struct StrategyConfig {
    /// Energy consumed by one token transfer, for "transfers possible" estimates.
    pub energy_per_transfer: u64,
}

#[derive(Clone, Default)]
pub struct SecretsConfig {
    pub private_keys: Vec<[u8; 32]>,
}

impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsConfig")
            .field("private_keys", &self.private_keys.len())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub tron: TronConfig,
    pub files: FilesConfig,
    pub pacing: PacingConfig,
    pub strategy: StrategyConfig,
    pub token: TokenConfig,
    pub secrets: SecretsConfig,
}
