//! The seam between wallet operations and the node.
//!
//! Operations are generic over [`Chain`]; [`TronChain`] talks to a real full node over HTTP and
//! tests substitute an in-memory fake.

use alloy::primitives::U256;
use anyhow::{Context, Result};
use tron::abi::{
    TRC20_BALANCE_OF, TRC20_TRANSFER, decode_u256_word, encode_trc20_balance_of_args,
    encode_trc20_transfer_args,
};
use tron::http::AccountInfo;
use tron::protocol::ResourceCode;
use tron::resources::{parse_account_resources, parse_energy_stake_totals};
use tron::{
    AccountResources, FeePolicy, ResourceStakeTotals, Trc20Abi, TronAddress, TronHttp, TxSigner,
    sender,
};

/// What the manager needs to know about an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountState {
    pub exists: bool,
    pub balance_sun: u64,
    pub frozen_energy_sun: u64,
    pub frozen_bandwidth_sun: u64,
    pub delegated_energy_sun: u64,
}

impl AccountState {
    pub fn frozen_sun(&self, resource: ResourceCode) -> u64 {
        match resource {
            ResourceCode::Energy => self.frozen_energy_sun,
            ResourceCode::Bandwidth => self.frozen_bandwidth_sun,
            ResourceCode::TronPower => 0,
        }
    }

    /// Own stake plus stake delegated out, i.e. everything frozen by this account.
    pub fn total_frozen_sun(&self) -> u64 {
        self.frozen_energy_sun
            .saturating_add(self.frozen_bandwidth_sun)
            .saturating_add(self.delegated_energy_sun)
    }
}

impl From<&AccountInfo> for AccountState {
    fn from(a: &AccountInfo) -> Self {
        Self {
            exists: a.exists(),
            balance_sun: a.balance_sun(),
            frozen_energy_sun: a.frozen_sun(ResourceCode::Energy),
            frozen_bandwidth_sun: a.frozen_sun(ResourceCode::Bandwidth),
            delegated_energy_sun: a.delegated_sun(ResourceCode::Energy),
        }
    }
}

/// A TRC20 token, optionally with `transfer`/`balanceOf` taken from an ABI file.
#[derive(Debug, Clone)]
pub struct Token {
    pub contract: TronAddress,
    pub decimals: u32,
    pub symbol: String,
    pub abi: Option<Trc20Abi>,
}

impl Token {
    pub fn new(contract: TronAddress, decimals: u32, symbol: impl Into<String>) -> Self {
        Self {
            contract,
            decimals,
            symbol: symbol.into(),
            abi: None,
        }
    }

    pub fn with_abi(mut self, abi: Trc20Abi) -> Self {
        self.abi = Some(abi);
        self
    }

    /// `(function_selector, parameter)` for `transfer(to, amount)`.
    pub fn transfer_call(&self, to: TronAddress, amount: U256) -> Result<(String, Vec<u8>)> {
        match &self.abi {
            Some(abi) => Ok((
                abi.transfer_signature(),
                abi.encode_transfer_args(to.evm(), amount)?,
            )),
            None => Ok((
                TRC20_TRANSFER.to_string(),
                encode_trc20_transfer_args(to.evm(), amount),
            )),
        }
    }

    pub fn balance_of_call(&self, owner: TronAddress) -> Result<(String, Vec<u8>)> {
        match &self.abi {
            Some(abi) => Ok((
                abi.balance_of_signature(),
                abi.encode_balance_of_args(owner.evm())?,
            )),
            None => Ok((
                TRC20_BALANCE_OF.to_string(),
                encode_trc20_balance_of_args(owner.evm()),
            )),
        }
    }
}

/// Node access used by the manager. Every submitting method returns the broadcast txid (hex).
#[allow(async_fn_in_trait)]
pub trait Chain {
    async fn account(&self, addr: TronAddress) -> Result<AccountState>;

    async fn resources(&self, addr: TronAddress) -> Result<AccountResources>;

    /// Network-wide energy stake totals (`TotalEnergyLimit`, `TotalEnergyWeight` in sun).
    async fn energy_totals(&self, addr: TronAddress) -> Result<ResourceStakeTotals>;

    async fn can_delegate_max(&self, owner: TronAddress, resource: ResourceCode) -> Result<u64>;

    /// Stake (sun) `owner` delegates to `receiver` for `resource`.
    async fn delegated_to(
        &self,
        owner: TronAddress,
        receiver: TronAddress,
        resource: ResourceCode,
    ) -> Result<u64>;

    async fn transfer_trx(
        &self,
        signer: &dyn TxSigner,
        to: TronAddress,
        amount_sun: u64,
        memo: Option<&str>,
    ) -> Result<String>;

    async fn freeze(
        &self,
        signer: &dyn TxSigner,
        amount_sun: u64,
        resource: ResourceCode,
    ) -> Result<String>;

    async fn unfreeze(
        &self,
        signer: &dyn TxSigner,
        amount_sun: u64,
        resource: ResourceCode,
    ) -> Result<String>;

    async fn delegate(
        &self,
        signer: &dyn TxSigner,
        receiver: TronAddress,
        amount_sun: u64,
        resource: ResourceCode,
    ) -> Result<String>;

    async fn undelegate(
        &self,
        signer: &dyn TxSigner,
        receiver: TronAddress,
        amount_sun: u64,
        resource: ResourceCode,
    ) -> Result<String>;

    async fn withdraw_unfrozen(&self, signer: &dyn TxSigner) -> Result<String>;

    async fn transfer_token(
        &self,
        signer: &dyn TxSigner,
        token: &Token,
        to: TronAddress,
        amount: U256,
    ) -> Result<String>;

    async fn token_balance(&self, owner: TronAddress, token: &Token) -> Result<U256>;
}

pub struct TronChain {
    http: TronHttp,
    fee_policy: FeePolicy,
}

impl TronChain {
    pub fn new(http: TronHttp, fee_policy: FeePolicy) -> Self {
        Self { http, fee_policy }
    }

    pub fn http(&self) -> &TronHttp {
        &self.http
    }
}

fn sun_i64(sun: u64) -> Result<i64> {
    i64::try_from(sun).context("amount out of range")
}

impl Chain for TronChain {
    async fn account(&self, addr: TronAddress) -> Result<AccountState> {
        let info = self
            .http
            .get_account(addr)
            .await
            .with_context(|| format!("getaccount {addr}"))?;
        Ok(AccountState::from(&info))
    }

    async fn resources(&self, addr: TronAddress) -> Result<AccountResources> {
        let msg = self
            .http
            .get_account_resource(addr)
            .await
            .with_context(|| format!("getaccountresource {addr}"))?;
        parse_account_resources(&msg)
    }

    async fn energy_totals(&self, addr: TronAddress) -> Result<ResourceStakeTotals> {
        let msg = self
            .http
            .get_account_resource(addr)
            .await
            .with_context(|| format!("getaccountresource {addr}"))?;
        parse_energy_stake_totals(&msg)
    }

    async fn can_delegate_max(&self, owner: TronAddress, resource: ResourceCode) -> Result<u64> {
        self.http.get_can_delegated_max_size(owner, resource).await
    }

    async fn delegated_to(
        &self,
        owner: TronAddress,
        receiver: TronAddress,
        resource: ResourceCode,
    ) -> Result<u64> {
        let list = self
            .http
            .get_delegated_resource_v2(owner, receiver)
            .await
            .with_context(|| format!("getdelegatedresourcev2 {owner} -> {receiver}"))?;
        Ok(list.total_sun(resource))
    }

    async fn transfer_trx(
        &self,
        signer: &dyn TxSigner,
        to: TronAddress,
        amount_sun: u64,
        memo: Option<&str>,
    ) -> Result<String> {
        let signed = sender::build_and_sign_transfer_contract(
            &self.http,
            signer,
            to,
            sun_i64(amount_sun)?,
            memo,
        )
        .await?;
        sender::broadcast(&self.http, &signed).await
    }

    async fn freeze(
        &self,
        signer: &dyn TxSigner,
        amount_sun: u64,
        resource: ResourceCode,
    ) -> Result<String> {
        let signed = sender::build_and_sign_freeze_balance_v2(
            &self.http,
            signer,
            sun_i64(amount_sun)?,
            resource,
        )
        .await?;
        sender::broadcast(&self.http, &signed).await
    }

    async fn unfreeze(
        &self,
        signer: &dyn TxSigner,
        amount_sun: u64,
        resource: ResourceCode,
    ) -> Result<String> {
        let signed = sender::build_and_sign_unfreeze_balance_v2(
            &self.http,
            signer,
            sun_i64(amount_sun)?,
            resource,
        )
        .await?;
        sender::broadcast(&self.http, &signed).await
    }

    async fn delegate(
        &self,
        signer: &dyn TxSigner,
        receiver: TronAddress,
        amount_sun: u64,
        resource: ResourceCode,
    ) -> Result<String> {
        let signed = sender::build_and_sign_delegate_resource_contract(
            &self.http,
            signer,
            receiver,
            resource,
            sun_i64(amount_sun)?,
            false,
            0,
        )
        .await?;
        sender::broadcast(&self.http, &signed).await
    }

    async fn undelegate(
        &self,
        signer: &dyn TxSigner,
        receiver: TronAddress,
        amount_sun: u64,
        resource: ResourceCode,
    ) -> Result<String> {
        let signed = sender::build_and_sign_undelegate_resource_contract(
            &self.http,
            signer,
            receiver,
            resource,
            sun_i64(amount_sun)?,
        )
        .await?;
        sender::broadcast(&self.http, &signed).await
    }

    async fn withdraw_unfrozen(&self, signer: &dyn TxSigner) -> Result<String> {
        let signed = sender::build_and_sign_withdraw_expire_unfreeze(&self.http, signer).await?;
        sender::broadcast(&self.http, &signed).await
    }

    async fn transfer_token(
        &self,
        signer: &dyn TxSigner,
        token: &Token,
        to: TronAddress,
        amount: U256,
    ) -> Result<String> {
        let (selector, parameter) = token.transfer_call(to, amount)?;
        let signed = sender::build_and_sign_trigger_smart_contract(
            &self.http,
            signer,
            token.contract,
            &selector,
            &parameter,
            0,
            self.fee_policy,
        )
        .await?;
        tracing::info!(
            energy_required = signed.energy_required,
            fee_limit_sun = signed.fee_limit_sun,
            "token transfer signed"
        );
        sender::broadcast(&self.http, &signed).await
    }

    async fn token_balance(&self, owner: TronAddress, token: &Token) -> Result<U256> {
        let (selector, parameter) = token.balance_of_call(owner)?;
        let resp = self
            .http
            .trigger_constant_contract(owner, token.contract, &selector, &parameter)
            .await?;
        let word = resp
            .constant_result
            .first()
            .context("balanceOf returned no result")?;
        decode_u256_word(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn account_state_from_node_account() {
        let info: AccountInfo = serde_json::from_value(json!({
            "address": "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t",
            "balance": 42_000_000,
            "frozenV2": [
                { "amount": 1_000_000 },
                { "type": "ENERGY", "amount": 20_000_000 }
            ],
            "account_resource": { "delegated_frozenV2_balance_for_energy": 10_000_000 }
        }))
        .unwrap();
        let s = AccountState::from(&info);
        assert!(s.exists);
        assert_eq!(s.balance_sun, 42_000_000);
        assert_eq!(s.frozen_sun(ResourceCode::Energy), 20_000_000);
        assert_eq!(s.frozen_sun(ResourceCode::Bandwidth), 1_000_000);
        assert_eq!(s.total_frozen_sun(), 31_000_000);
    }

    #[test]
    fn token_calls_match_with_and_without_abi() {
        let contract = TronAddress::parse_text("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t").unwrap();
        let to = TronAddress::from_evm(alloy::primitives::Address::repeat_byte(0x11));
        let plain = Token::new(contract, 6, "USDT");
        let abi = Trc20Abi::from_json(
            r#"[{"inputs":[{"name":"to","type":"address"},{"name":"value","type":"uint256"}],
                 "name":"transfer","outputs":[{"name":"","type":"bool"}],
                 "stateMutability":"nonpayable","type":"function"},
                {"inputs":[{"name":"who","type":"address"}],"name":"balanceOf",
                 "outputs":[{"name":"","type":"uint256"}],"stateMutability":"view",
                 "type":"function"}]"#,
        )
        .unwrap();
        let with_abi = plain.clone().with_abi(abi);
        let amount = U256::from(5_000_000u64);
        assert_eq!(
            plain.transfer_call(to, amount).unwrap(),
            with_abi.transfer_call(to, amount).unwrap()
        );
        assert_eq!(
            plain.balance_of_call(to).unwrap(),
            with_abi.balance_of_call(to).unwrap()
        );
    }
}
