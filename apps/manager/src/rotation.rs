//! Freeze-then-delegate across every energy provider, one wallet at a time.

use crate::amount::format_sun;
use crate::chain::Chain;
use crate::history::TxKind;
use crate::ops::Manager;
use anyhow::Result;
use tron::{SUN_PER_TRX, TronAddress};
use tron::protocol::ResourceCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegateOutcome {
    Delegated { txid: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletOutcome {
    /// Balance below the freeze amount; nothing was submitted.
    Skipped { balance_sun: u64 },
    /// No usable signing key for the wallet; nothing was submitted.
    SignerUnavailable { error: String },
    BalanceQueryFailed { error: String },
    FreezeFailed { error: String },
    Frozen {
        freeze_txid: String,
        delegate: DelegateOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletRotation {
    pub wallet: String,
    pub address: String,
    pub outcome: WalletOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationReport {
    pub amount_sun: u64,
    pub main_wallet: String,
    pub wallets: Vec<WalletRotation>,
}

impl RotationReport {
    pub fn frozen_count(&self) -> usize {
        self.wallets
            .iter()
            .filter(|w| matches!(w.outcome, WalletOutcome::Frozen { .. }))
            .count()
    }

    pub fn delegated_count(&self) -> usize {
        self.wallets
            .iter()
            .filter(|w| {
                matches!(
                    w.outcome,
                    WalletOutcome::Frozen {
                        delegate: DelegateOutcome::Delegated { .. },
                        ..
                    }
                )
            })
            .count()
    }
}

impl<C: Chain> Manager<C> {
    /// For each provider in wallet-list order: check balance, freeze `amount_sun` for ENERGY,
    /// settle, then delegate the same amount to the main wallet. A wallet's failure never stops
    /// the ones after it, and there is no rollback of partial state.
    pub async fn rotate(&mut self, amount_sun: u64) -> Result<RotationReport> {
        if amount_sun < SUN_PER_TRX {
            anyhow::bail!(
                "freeze amount must be at least 1 TRX (got {} TRX)",
                format_sun(amount_sun)
            );
        }
        let main = self.store.main_address()?;
        let providers = self.store.provider_names();
        tracing::info!(
            providers = providers.len(),
            amount_sun,
            main = %main,
            "starting resource rotation"
        );

        let mut wallets = Vec::with_capacity(providers.len());
        let last = providers.len().saturating_sub(1);
        for (i, name) in providers.iter().enumerate() {
            let address = self.store.get(name)?.address.clone();
            let outcome = self.rotate_one(name, amount_sun, main).await;
            wallets.push(WalletRotation {
                wallet: name.clone(),
                address,
                outcome,
            });
            if i < last {
                self.pacer.wallet_gap().await;
            }
        }

        let report = RotationReport {
            amount_sun,
            main_wallet: main.to_base58check(),
            wallets,
        };
        tracing::info!(
            frozen = report.frozen_count(),
            delegated = report.delegated_count(),
            "resource rotation finished"
        );
        Ok(report)
    }

    /// Every failure local to one wallet becomes its outcome.
    async fn rotate_one(
        &mut self,
        name: &str,
        amount_sun: u64,
        main: TronAddress,
    ) -> WalletOutcome {
        let signer = match self.signer(name) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(wallet = %name, err = %format!("{err:#}"), "no usable signer");
                return WalletOutcome::SignerUnavailable {
                    error: format!("{err:#}"),
                };
            }
        };
        let owner = signer.address();

        let balance_sun = match self.chain.account(owner).await {
            Ok(s) => s.balance_sun,
            Err(err) => {
                tracing::warn!(wallet = %name, err = %format!("{err:#}"), "balance query failed");
                return WalletOutcome::BalanceQueryFailed {
                    error: format!("{err:#}"),
                };
            }
        };
        if balance_sun < amount_sun {
            tracing::warn!(
                wallet = %name,
                balance = %format_sun(balance_sun),
                needed = %format_sun(amount_sun),
                "balance below freeze amount; skipping"
            );
            return WalletOutcome::Skipped { balance_sun };
        }

        self.pacer.before_submit().await;
        let freeze_txid = match self
            .chain
            .freeze(signer.as_ref(), amount_sun, ResourceCode::Energy)
            .await
        {
            Ok(txid) => txid,
            Err(err) => {
                tracing::warn!(wallet = %name, err = %format!("{err:#}"), "freeze failed");
                return WalletOutcome::FreezeFailed {
                    error: format!("{err:#}"),
                };
            }
        };
        tracing::info!(wallet = %name, txid = %freeze_txid, amount_sun, "frozen for energy");
        self.record_tx(
            TxKind::Freeze,
            &freeze_txid,
            owner,
            owner,
            format!("{} TRX (ENERGY)", format_sun(amount_sun)),
        );
        if let Err(err) = self.record_freeze(name, amount_sun) {
            tracing::warn!(wallet = %name, err = %format!("{err:#}"), "failed to record freeze");
        }

        self.pacer.settle().await;

        self.pacer.before_submit().await;
        let delegate = match self
            .chain
            .delegate(signer.as_ref(), main, amount_sun, ResourceCode::Energy)
            .await
        {
            Ok(txid) => {
                tracing::info!(wallet = %name, txid = %txid, "energy delegated to main wallet");
                self.record_tx(
                    TxKind::Delegate,
                    &txid,
                    owner,
                    main,
                    format!("{} TRX (ENERGY)", format_sun(amount_sun)),
                );
                DelegateOutcome::Delegated { txid }
            }
            Err(err) => {
                tracing::warn!(wallet = %name, err = %format!("{err:#}"), "delegate failed");
                DelegateOutcome::Failed {
                    error: format!("{err:#}"),
                }
            }
        };

        WalletOutcome::Frozen {
            freeze_txid,
            delegate,
        }
    }
}
