//! Single-wallet operations and the batch helpers built on them.

use crate::amount::{format_sun, format_token, trx_to_sun};
use crate::chain::{AccountState, Chain, Token};
use crate::history::{History, TxKind, TxRecord};
use crate::pacer::Pacer;
use crate::profile::BudgetProfile;
use crate::secrets::{SecretProvider, StoreSecrets};
use crate::store::{WalletFile, WalletRole, WalletStore, write_json_atomic};
use alloy::primitives::U256;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use tron::protocol::ResourceCode;
use tron::resources::{AccountResources, energy_for_frozen_sun, trx_sun_for_resource_units};
use tron::{SUN_PER_TRX, TronAddress, TronWallet, TxSigner};

/// Default energy consumed by one TRC20 transfer.
pub const DEFAULT_ENERGY_PER_TRANSFER: u64 = 30_000;

/// Result of one submission inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Sent { txid: String },
    Skipped { reason: String },
    Failed { error: String },
}

impl StepOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }

    pub(crate) fn from_result(r: Result<String>) -> Self {
        match r {
            Ok(txid) => Self::Sent { txid },
            Err(err) => Self::Failed {
                error: format!("{err:#}"),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletStep {
    pub wallet: String,
    pub address: String,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    /// Exists on chain and holds TRX.
    Activated,
    /// Exists on chain with a zero balance.
    Unfunded,
    /// Unknown to the node; it needs an incoming TRX transfer first.
    NotActivated,
}

impl AccountStatus {
    pub fn from_state(s: &AccountState) -> Self {
        match (s.exists, s.balance_sun) {
            (false, _) => Self::NotActivated,
            (true, 0) => Self::Unfunded,
            (true, _) => Self::Activated,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Activated => "activated",
            Self::Unfunded => "activated, no TRX balance",
            Self::NotActivated => "not activated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletView {
    pub name: String,
    pub label: String,
    pub role: WalletRole,
    pub address: String,
    pub balance_sun: u64,
    pub frozen_sun: u64,
    pub energy_available: u64,
    pub energy_limit: u64,
    /// Bytes of staked plus free bandwidth left today.
    pub bandwidth_available: u64,
    /// Set when the node query for this wallet failed; the numbers are then zero.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub title: &'static str,
    pub wallets: Vec<WalletView>,
    pub total_balance_sun: u64,
    pub total_frozen_sun: u64,
    pub total_energy: u64,
    pub energy_per_transfer: u64,
    pub transfers_possible: u64,
    /// TRX not burned when every possible transfer is paid with energy.
    pub saved_fee_trx: u64,
    /// `saved_fee / (providers * freeze default)`, in percent.
    pub roi_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyPlan {
    pub target_energy: u64,
    pub required_sun: u64,
    /// Energy yielded by 1 TRX at the current network totals.
    pub energy_per_trx: u64,
}

pub struct Manager<C> {
    pub(crate) chain: C,
    pub(crate) secrets: Box<dyn SecretProvider>,
    pub(crate) store: WalletStore,
    pub(crate) history: History,
    pub(crate) pacer: Pacer,
    pub(crate) profile: BudgetProfile,
    pub(crate) token: Token,
    pub(crate) energy_per_transfer: u64,
}

impl<C: Chain> Manager<C> {
    pub fn new(
        chain: C,
        store: WalletStore,
        history: History,
        profile: BudgetProfile,
        token: Token,
    ) -> Self {
        Self {
            chain,
            secrets: Box::new(StoreSecrets),
            store,
            history,
            pacer: Pacer::new(Default::default()),
            profile,
            token,
            energy_per_transfer: DEFAULT_ENERGY_PER_TRANSFER,
        }
    }

    pub fn with_secrets(mut self, secrets: Box<dyn SecretProvider>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_energy_per_transfer(mut self, energy: u64) -> Self {
        self.energy_per_transfer = energy.max(1);
        self
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn store(&self) -> &WalletStore {
        &self.store
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn profile(&self) -> &BudgetProfile {
        &self.profile
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub(crate) fn signer(&self, name: &str) -> Result<Box<dyn TxSigner>> {
        let record = self.store.get(name)?;
        self.secrets.signer_for(name, record)
    }

    fn address_of(&self, name: &str) -> Result<TronAddress> {
        self.store.get(name)?.tron_address()
    }

    /// A broadcast already happened, so a failed history write is only logged.
    pub(crate) fn record_tx(
        &self,
        kind: TxKind,
        txid: &str,
        from: TronAddress,
        to: TronAddress,
        amount: String,
    ) {
        let rec = TxRecord::sent(
            kind,
            txid,
            from.to_base58check(),
            to.to_base58check(),
            amount,
        );
        if let Err(err) = self.history.append(rec) {
            tracing::warn!(txid, err = %format!("{err:#}"), "failed to append history");
        }
    }

    pub(crate) fn record_freeze(&mut self, name: &str, amount_sun: u64) -> Result<()> {
        let rec = self.store.get_mut(name)?;
        rec.frozen_sun = rec.frozen_sun.saturating_add(amount_sun);
        rec.last_freeze_time = Some(Utc::now());
        self.store.save()
    }

    /// Replaces the wallet set with a fresh one laid out by the active profile.
    pub fn generate(&mut self) -> Result<()> {
        self.store.regenerate(&self.profile)?;
        tracing::info!(
            profile = self.profile.title,
            wallets = self.store.file().wallets.len(),
            path = %self.store.path().display(),
            "generated wallets"
        );
        Ok(())
    }

    pub fn import(&mut self, private_key_hex: &str, name: Option<String>) -> Result<String> {
        let wallet = TronWallet::from_hex(private_key_hex)?;
        let name = self.store.import(&wallet, name)?;
        tracing::info!(wallet = %name, address = %wallet.address(), "imported wallet");
        Ok(name)
    }

    pub fn export(&self) -> &WalletFile {
        self.store.file()
    }

    /// Queries every wallet and records its energy limit. Per-wallet query failures are kept in
    /// the view instead of failing the whole overview.
    pub async fn overview(&mut self) -> Result<Overview> {
        let entries: Vec<(String, String, WalletRole, String)> = self
            .store
            .file()
            .wallets
            .iter()
            .map(|(n, w)| (n.clone(), w.label(n).to_string(), w.role, w.address.clone()))
            .collect();

        let mut wallets = Vec::with_capacity(entries.len());
        let mut energy_changed = false;
        for (name, label, role, address) in entries {
            let mut view = WalletView {
                name: name.clone(),
                label,
                role,
                address,
                balance_sun: 0,
                frozen_sun: 0,
                energy_available: 0,
                energy_limit: 0,
                bandwidth_available: 0,
                error: None,
            };
            match self.query_wallet(&name).await {
                Ok((state, res)) => {
                    let energy_limit = res.energy_limit;
                    view.balance_sun = state.balance_sun;
                    view.frozen_sun = state.total_frozen_sun();
                    view.energy_available = res.energy_available();
                    view.energy_limit = energy_limit;
                    view.bandwidth_available = res.bandwidth_available();
                    let rec = self.store.get_mut(&name)?;
                    if rec.energy_balance != energy_limit {
                        rec.energy_balance = energy_limit;
                        energy_changed = true;
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        wallet = %name,
                        err = %format!("{err:#}"),
                        "balance query failed"
                    );
                    view.error = Some(format!("{err:#}"));
                }
            }
            wallets.push(view);
        }
        if energy_changed {
            self.store.save()?;
        }

        let total_balance_sun = wallets.iter().map(|w| w.balance_sun).sum();
        let total_frozen_sun = wallets.iter().map(|w| w.frozen_sun).sum();
        let total_energy: u64 = wallets.iter().map(|w| w.energy_available).sum();
        let transfers_possible = total_energy / self.energy_per_transfer;
        let saved_fee_trx =
            transfers_possible.saturating_mul(self.profile.saved_fee_per_transfer_trx);
        let invested_trx = (self.profile.provider_count() as u64)
            .saturating_mul(self.profile.freeze_default_trx);
        let roi_percent = if invested_trx == 0 {
            0.0
        } else {
            saved_fee_trx as f64 / invested_trx as f64 * 100.0
        };

        Ok(Overview {
            title: self.profile.title,
            wallets,
            total_balance_sun,
            total_frozen_sun,
            total_energy,
            energy_per_transfer: self.energy_per_transfer,
            transfers_possible,
            saved_fee_trx,
            roi_percent,
        })
    }

    async fn query_wallet(&self, name: &str) -> Result<(AccountState, AccountResources)> {
        let addr = self.address_of(name)?;
        let state = self.chain.account(addr).await?;
        let res = self.chain.resources(addr).await?;
        Ok((state, res))
    }

    /// Sends `amount_sun` from the main wallet to every provider. The main wallet must hold
    /// `amount * providers + reserve`; individual transfer failures are recorded and skipped.
    pub async fn distribute(&mut self, amount_sun: u64) -> Result<Vec<WalletStep>> {
        if amount_sun == 0 {
            anyhow::bail!("distribute amount must be greater than zero");
        }
        let (main_name, _) = self
            .store
            .file()
            .main_entry()
            .context("main wallet is not set; generate or import wallets first")?;
        let main_name = main_name.clone();
        let providers = self.store.provider_names();
        if providers.is_empty() {
            anyhow::bail!("no energy provider wallets to distribute to");
        }

        let main_addr = self.address_of(&main_name)?;
        let needed = amount_sun
            .checked_mul(providers.len() as u64)
            .and_then(|v| v.checked_add(trx_to_sun(self.profile.reserve_trx)))
            .context("distribute amount too large")?;
        let state = self
            .chain
            .account(main_addr)
            .await
            .context("query main wallet balance")?;
        if state.balance_sun < needed {
            anyhow::bail!(
                "main wallet balance {} TRX is below the {} TRX needed \
                 ({} TRX x {} wallets + {} TRX reserve)",
                format_sun(state.balance_sun),
                format_sun(needed),
                format_sun(amount_sun),
                providers.len(),
                self.profile.reserve_trx
            );
        }

        let signer = self.signer(&main_name)?;
        let mut steps = Vec::with_capacity(providers.len());
        let last = providers.len().saturating_sub(1);
        for (i, name) in providers.iter().enumerate() {
            let to = self.address_of(name)?;
            self.pacer.before_submit().await;
            let res = self
                .chain
                .transfer_trx(signer.as_ref(), to, amount_sun, None)
                .await;
            match &res {
                Ok(txid) => {
                    tracing::info!(wallet = %name, txid = %txid, amount_sun, "distributed");
                    self.record_tx(
                        TxKind::TrxTransfer,
                        txid,
                        main_addr,
                        to,
                        format!("{} TRX", format_sun(amount_sun)),
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        wallet = %name,
                        err = %format!("{err:#}"),
                        "distribute transfer failed"
                    );
                }
            }
            steps.push(WalletStep {
                wallet: name.clone(),
                address: to.to_base58check(),
                outcome: StepOutcome::from_result(res),
            });
            if i < last {
                self.pacer.transfer_gap().await;
            }
        }
        Ok(steps)
    }

    /// Freezes at least 1 TRX for `resource`.
    pub async fn freeze(
        &mut self,
        name: &str,
        amount_sun: u64,
        resource: ResourceCode,
    ) -> Result<String> {
        if amount_sun < SUN_PER_TRX {
            anyhow::bail!(
                "freeze amount must be at least 1 TRX (got {} TRX)",
                format_sun(amount_sun)
            );
        }
        if resource == ResourceCode::TronPower {
            anyhow::bail!("freezing for TRON_POWER is not supported; use ENERGY or BANDWIDTH");
        }
        let signer = self.signer(name)?;
        let owner = signer.address();
        self.pacer.before_submit().await;
        let txid = self
            .chain
            .freeze(signer.as_ref(), amount_sun, resource)
            .await
            .with_context(|| format!("freeze {} TRX in {name}", format_sun(amount_sun)))?;
        tracing::info!(
            wallet = %name,
            txid = %txid,
            amount_sun,
            resource = resource.as_api_str(),
            "frozen"
        );
        self.record_tx(
            TxKind::Freeze,
            &txid,
            owner,
            owner,
            format!("{} TRX ({})", format_sun(amount_sun), resource.as_api_str()),
        );
        self.record_freeze(name, amount_sun)?;
        Ok(txid)
    }

    /// Delegates ENERGY from `name` to the main wallet. Without an amount, delegates whatever the
    /// node reports as delegatable; returns `None` when that is nothing.
    pub async fn delegate(
        &mut self,
        name: &str,
        amount_sun: Option<u64>,
    ) -> Result<Option<String>> {
        let receiver = self.store.main_address()?;
        let signer = self.signer(name)?;
        let owner = signer.address();
        if owner == receiver {
            anyhow::bail!("{name} is the main wallet; it cannot delegate to itself");
        }
        let amount_sun = match amount_sun {
            Some(0) => anyhow::bail!("delegate amount must be greater than zero"),
            Some(v) => v,
            None => self
                .chain
                .can_delegate_max(owner, ResourceCode::Energy)
                .await
                .with_context(|| format!("query delegatable energy stake of {name}"))?,
        };
        if amount_sun == 0 {
            tracing::warn!(wallet = %name, "nothing to delegate; freeze TRX for energy first");
            return Ok(None);
        }
        self.pacer.before_submit().await;
        let txid = self
            .chain
            .delegate(signer.as_ref(), receiver, amount_sun, ResourceCode::Energy)
            .await
            .with_context(|| format!("delegate energy from {name}"))?;
        tracing::info!(wallet = %name, txid = %txid, amount_sun, receiver = %receiver, "delegated");
        self.record_tx(
            TxKind::Delegate,
            &txid,
            owner,
            receiver,
            format!("{} TRX (ENERGY)", format_sun(amount_sun)),
        );
        Ok(Some(txid))
    }

    /// Reclaims ENERGY delegated from `name` to the main wallet. Without an amount, reclaims
    /// what is delegated to the main wallet; stake delegated elsewhere is left alone.
    pub async fn undelegate(
        &mut self,
        name: &str,
        amount_sun: Option<u64>,
    ) -> Result<Option<String>> {
        let receiver = self.store.main_address()?;
        let signer = self.signer(name)?;
        let owner = signer.address();
        let amount_sun = match amount_sun {
            Some(0) => anyhow::bail!("undelegate amount must be greater than zero"),
            Some(v) => v,
            None => {
                self.chain
                    .delegated_to(owner, receiver, ResourceCode::Energy)
                    .await?
            }
        };
        if amount_sun == 0 {
            tracing::warn!(wallet = %name, "nothing delegated to reclaim");
            return Ok(None);
        }
        self.pacer.before_submit().await;
        let txid = self
            .chain
            .undelegate(signer.as_ref(), receiver, amount_sun, ResourceCode::Energy)
            .await
            .with_context(|| format!("undelegate energy from {name}"))?;
        tracing::info!(wallet = %name, txid = %txid, amount_sun, "undelegated");
        self.record_tx(
            TxKind::Undelegate,
            &txid,
            owner,
            receiver,
            format!("{} TRX (ENERGY)", format_sun(amount_sun)),
        );
        Ok(Some(txid))
    }

    /// Starts unstaking. Without an amount, unstakes everything frozen for `resource` and resets
    /// the wallet's frozen bookkeeping.
    pub async fn unfreeze(
        &mut self,
        name: &str,
        amount_sun: Option<u64>,
        resource: ResourceCode,
    ) -> Result<Option<String>> {
        let signer = self.signer(name)?;
        let owner = signer.address();
        let (amount_sun, full) = match amount_sun {
            Some(0) => anyhow::bail!("unfreeze amount must be greater than zero"),
            Some(v) => (v, false),
            None => (self.chain.account(owner).await?.frozen_sun(resource), true),
        };
        if amount_sun == 0 {
            tracing::warn!(
                wallet = %name,
                resource = resource.as_api_str(),
                "no frozen balance to unfreeze"
            );
            return Ok(None);
        }
        self.pacer.before_submit().await;
        let txid = self
            .chain
            .unfreeze(signer.as_ref(), amount_sun, resource)
            .await
            .with_context(|| format!("unfreeze {} TRX in {name}", format_sun(amount_sun)))?;
        tracing::info!(wallet = %name, txid = %txid, amount_sun, "unfreeze started");
        self.record_tx(
            TxKind::Unfreeze,
            &txid,
            owner,
            owner,
            format!("{} TRX ({})", format_sun(amount_sun), resource.as_api_str()),
        );
        let rec = self.store.get_mut(name)?;
        rec.frozen_sun = if full {
            0
        } else {
            rec.frozen_sun.saturating_sub(amount_sun)
        };
        rec.last_unfreeze_time = Some(Utc::now());
        self.store.save()?;
        Ok(Some(txid))
    }

    /// Withdraws stake whose unfreezing period has elapsed.
    pub async fn withdraw(&mut self, name: &str) -> Result<String> {
        let signer = self.signer(name)?;
        let owner = signer.address();
        self.pacer.before_submit().await;
        let txid = self
            .chain
            .withdraw_unfrozen(signer.as_ref())
            .await
            .with_context(|| format!("withdraw expired unfreeze of {name}"))?;
        tracing::info!(wallet = %name, txid = %txid, "withdrawn");
        self.record_tx(TxKind::Withdraw, &txid, owner, owner, String::new());
        Ok(txid)
    }

    pub async fn send_trx(
        &mut self,
        name: &str,
        to: TronAddress,
        amount_sun: u64,
        memo: Option<&str>,
    ) -> Result<String> {
        if amount_sun == 0 {
            anyhow::bail!("transfer amount must be greater than zero");
        }
        let signer = self.signer(name)?;
        let from = signer.address();
        if from == to {
            anyhow::bail!("cannot send TRX from {name} to itself");
        }
        self.pacer.before_submit().await;
        let txid = self
            .chain
            .transfer_trx(signer.as_ref(), to, amount_sun, memo)
            .await
            .with_context(|| format!("send {} TRX from {name}", format_sun(amount_sun)))?;
        tracing::info!(wallet = %name, txid = %txid, to = %to, amount_sun, "TRX sent");
        self.record_tx(
            TxKind::TrxTransfer,
            &txid,
            from,
            to,
            format!("{} TRX", format_sun(amount_sun)),
        );
        Ok(txid)
    }

    pub async fn send_token(
        &mut self,
        name: &str,
        to: TronAddress,
        amount: U256,
    ) -> Result<String> {
        if amount.is_zero() {
            anyhow::bail!("token amount must be greater than zero");
        }
        let signer = self.signer(name)?;
        let from = signer.address();
        self.pacer.before_submit().await;
        let txid = self
            .chain
            .transfer_token(signer.as_ref(), &self.token, to, amount)
            .await
            .with_context(|| format!("send {} from {name}", self.token.symbol))?;
        let shown = format!(
            "{} {}",
            format_token(amount, self.token.decimals),
            self.token.symbol
        );
        tracing::info!(wallet = %name, txid = %txid, to = %to, amount = %shown, "token sent");
        self.record_tx(TxKind::TokenTransfer, &txid, from, to, shown);
        Ok(txid)
    }

    pub async fn token_balance(&self, name: &str) -> Result<U256> {
        let addr = self.address_of(name)?;
        self.chain.token_balance(addr, &self.token).await
    }

    pub async fn status(&self, name: &str) -> Result<AccountStatus> {
        let addr = self.address_of(name)?;
        let state = self.chain.account(addr).await?;
        Ok(AccountStatus::from_state(&state))
    }

    /// Stake needed for `target_energy` at the current network totals.
    pub async fn plan(&self, target_energy: u64) -> Result<EnergyPlan> {
        if target_energy == 0 {
            anyhow::bail!("target energy must be greater than zero");
        }
        let addr = match self.store.main_address() {
            Ok(a) => a,
            Err(_) => self.token.contract,
        };
        let totals = self.chain.energy_totals(addr).await?;
        Ok(EnergyPlan {
            target_energy,
            required_sun: trx_sun_for_resource_units(target_energy, totals, 0),
            energy_per_trx: energy_for_frozen_sun(SUN_PER_TRX, totals),
        })
    }

    pub fn backup(&self, path: &Path, note: &str) -> Result<()> {
        let backup = self.store.backup(note);
        write_json_atomic(path, &backup)?;
        tracing::info!(path = %path.display(), wallets = backup.wallets.len(), "backup written");
        Ok(())
    }

    pub fn history_list(&self) -> Result<Vec<TxRecord>> {
        self.history.list()
    }
}
