use crate::fake_node::FakeTronNode;
use alloy::primitives::Address;
use anyhow::{Context, Result};
use manager::chain::{Token, TronChain};
use manager::history::History;
use manager::ops::Manager;
use manager::pacer::{Pacer, PacingConfig};
use manager::profile::BudgetProfile;
use manager::store::WalletStore;
use std::path::Path;
use std::time::Duration;
use tron::{FeePolicy, TronAddress, TronHttp};

pub const TEST_API_KEY: &str = "e2e-api-key";

/// Token contract address used by the fake node's TRC20.
pub fn token_contract() -> TronAddress {
    TronAddress::from_evm(Address::repeat_byte(0x7a))
}

/// Manager talking HTTP to `node`, with generated wallets in `dir` and no pauses.
pub fn http_manager(
    node: &FakeTronNode,
    dir: &Path,
    profile: BudgetProfile,
) -> Result<Manager<TronChain>> {
    let http = TronHttp::new(&node.base_url, Some(TEST_API_KEY), Duration::from_secs(5))
        .context("build tron http client")?;
    let chain = TronChain::new(http, FeePolicy::default());
    let store = WalletStore::load(dir.join("wallets.json"))?;
    let history = History::new(dir.join("transaction_history.json"));
    let token = Token::new(token_contract(), 6, "USDT");
    let mut m = Manager::new(chain, store, history, profile, token)
        .with_pacer(Pacer::new(PacingConfig::zero()));
    m.generate()?;
    Ok(m)
}

pub fn wallet_address(m: &Manager<TronChain>, name: &str) -> Result<TronAddress> {
    m.store().get(name)?.tron_address()
}
