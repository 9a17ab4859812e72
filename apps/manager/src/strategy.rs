//! Batch steps over all providers and the small-budget strategy that chains them.

use crate::amount::trx_to_sun;
use crate::chain::Chain;
use crate::ops::{Manager, StepOutcome, WalletStep};
use anyhow::Result;
use tron::protocol::ResourceCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyStep {
    Distribute,
    Freeze,
    Delegate,
}

impl StrategyStep {
    pub fn label(self) -> &'static str {
        match self {
            Self::Distribute => "distribute TRX",
            Self::Freeze => "freeze for energy",
            Self::Delegate => "delegate to main wallet",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyReport {
    pub distribute: Vec<WalletStep>,
    pub freeze: Vec<WalletStep>,
    pub delegate: Vec<WalletStep>,
    /// First step that did not meet its success condition, if any.
    pub stopped_at: Option<StrategyStep>,
}

impl StrategyReport {
    pub fn completed(&self) -> bool {
        self.stopped_at.is_none()
    }
}

fn all_sent(steps: &[WalletStep]) -> bool {
    !steps.is_empty() && steps.iter().all(|s| s.outcome.is_sent())
}

impl<C: Chain> Manager<C> {
    /// Freezes `amount_sun` for ENERGY in every provider, continuing past failures.
    pub async fn freeze_all(&mut self, amount_sun: u64) -> Result<Vec<WalletStep>> {
        if amount_sun == 0 {
            anyhow::bail!("freeze amount must be greater than zero");
        }
        let providers = self.store.provider_names();
        let mut steps = Vec::with_capacity(providers.len());
        let last = providers.len().saturating_sub(1);
        for (i, name) in providers.iter().enumerate() {
            let address = self.store.get(name)?.address.clone();
            let outcome = StepOutcome::from_result(
                self.freeze(name, amount_sun, ResourceCode::Energy).await,
            );
            if let StepOutcome::Failed { error } = &outcome {
                tracing::warn!(wallet = %name, err = %error, "freeze failed");
            }
            steps.push(WalletStep {
                wallet: name.clone(),
                address,
                outcome,
            });
            if i < last {
                self.pacer.transfer_gap().await;
            }
        }
        Ok(steps)
    }

    /// Delegates each provider's delegatable energy stake to the main wallet.
    pub async fn delegate_all(&mut self) -> Result<Vec<WalletStep>> {
        self.store.main_address()?;
        let providers = self.store.provider_names();
        let mut steps = Vec::with_capacity(providers.len());
        let last = providers.len().saturating_sub(1);
        for (i, name) in providers.iter().enumerate() {
            let address = self.store.get(name)?.address.clone();
            let outcome = match self.delegate(name, None).await {
                Ok(Some(txid)) => StepOutcome::Sent { txid },
                Ok(None) => StepOutcome::Skipped {
                    reason: "nothing to delegate".to_string(),
                },
                Err(err) => {
                    tracing::warn!(wallet = %name, err = %format!("{err:#}"), "delegate failed");
                    StepOutcome::Failed {
                        error: format!("{err:#}"),
                    }
                }
            };
            steps.push(WalletStep {
                wallet: name.clone(),
                address,
                outcome,
            });
            if i < last {
                self.pacer.transfer_gap().await;
            }
        }
        Ok(steps)
    }

    /// distribute, pause, freeze all, pause, delegate all; amounts are the profile's defaults.
    /// Distribute and freeze must succeed for every provider and delegate for at least one;
    /// the strategy stops at the first step that falls short.
    pub async fn run_small_budget_strategy(&mut self) -> Result<StrategyReport> {
        let distribute_sun = trx_to_sun(self.profile.distribute_default_trx);
        let freeze_sun = trx_to_sun(self.profile.freeze_default_trx);
        let mut report = StrategyReport {
            distribute: Vec::new(),
            freeze: Vec::new(),
            delegate: Vec::new(),
            stopped_at: None,
        };

        tracing::info!(step = StrategyStep::Distribute.label(), "strategy step");
        report.distribute = self.distribute(distribute_sun).await?;
        if !all_sent(&report.distribute) {
            report.stopped_at = Some(StrategyStep::Distribute);
            return Ok(report);
        }
        self.pacer.strategy_step().await;

        tracing::info!(step = StrategyStep::Freeze.label(), "strategy step");
        report.freeze = self.freeze_all(freeze_sun).await?;
        if !all_sent(&report.freeze) {
            report.stopped_at = Some(StrategyStep::Freeze);
            return Ok(report);
        }
        self.pacer.strategy_step().await;

        tracing::info!(step = StrategyStep::Delegate.label(), "strategy step");
        report.delegate = self.delegate_all().await?;
        if !report.delegate.iter().any(|s| s.outcome.is_sent()) {
            report.stopped_at = Some(StrategyStep::Delegate);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::tests::{addr, manager_with};
    use crate::profile::BudgetProfile;
    use crate::testing::Call;

    #[tokio::test]
    async fn small_budget_strategy_runs_all_three_steps() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = manager_with(&dir, BudgetProfile::small_budget());
        let main = addr(&m, "wallet_A");
        m.chain().fund(main, trx_to_sun(30));

        let report = m.run_small_budget_strategy().await.unwrap();
        assert!(report.completed(), "{report:?}");
        assert_eq!(report.distribute.len(), 2);
        assert_eq!(report.freeze.len(), 2);
        assert_eq!(report.delegate.len(), 2);

        for name in ["wallet_B", "wallet_C"] {
            let s = m.chain().state_of(addr(&m, name));
            assert_eq!(s.balance_sun, 0);
            assert_eq!(s.delegated_energy_sun, trx_to_sun(10));
        }
        assert_eq!(m.chain().state_of(main).balance_sun, trx_to_sun(10));
        // 2 transfers, 2 freezes, 2 delegations
        assert_eq!(m.history_list().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn strategy_stops_when_a_distribution_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = manager_with(&dir, BudgetProfile::small_budget());
        m.chain().fund(addr(&m, "wallet_A"), trx_to_sun(30));
        m.chain().fail_transfer_to(addr(&m, "wallet_C"));

        let report = m.run_small_budget_strategy().await.unwrap();
        assert_eq!(report.stopped_at, Some(StrategyStep::Distribute));
        assert!(report.freeze.is_empty());
        assert!(
            !m.chain()
                .submissions()
                .iter()
                .any(|c| matches!(c, Call::Freeze { .. }))
        );
    }

    #[tokio::test]
    async fn strategy_stops_when_a_freeze_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = manager_with(&dir, BudgetProfile::small_budget());
        m.chain().fund(addr(&m, "wallet_A"), trx_to_sun(30));
        m.chain().fail_freeze(addr(&m, "wallet_B"));

        let report = m.run_small_budget_strategy().await.unwrap();
        assert_eq!(report.stopped_at, Some(StrategyStep::Freeze));
        assert_eq!(report.freeze.len(), 2);
        assert!(report.freeze[1].outcome.is_sent());
        assert!(report.delegate.is_empty());
    }

    #[tokio::test]
    async fn one_successful_delegation_is_enough() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = manager_with(&dir, BudgetProfile::small_budget());
        m.chain().fund(addr(&m, "wallet_A"), trx_to_sun(30));
        m.chain().fail_delegate(addr(&m, "wallet_B"));

        let report = m.run_small_budget_strategy().await.unwrap();
        assert!(report.completed());
        assert!(matches!(
            report.delegate[0].outcome,
            StepOutcome::Failed { .. }
        ));
        assert!(report.delegate[1].outcome.is_sent());
    }

    #[tokio::test]
    async fn delegate_all_skips_wallets_without_stake() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = manager_with(&dir, BudgetProfile::multi());
        let steps = m.delegate_all().await.unwrap();
        assert_eq!(steps.len(), 4);
        assert!(
            steps
                .iter()
                .all(|s| matches!(s.outcome, StepOutcome::Skipped { .. }))
        );
        assert!(m.chain().submissions().is_empty());
    }
}
