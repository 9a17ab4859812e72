use crate::store::WalletRole;

/// Which wallet layout and defaults the manager runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BudgetKind {
    /// Five wallets: one main, four energy providers.
    Multi,
    /// Three wallets sized for a ~30 TRX budget.
    SmallBudget,
}

#[derive(Debug, Clone)]
pub struct WalletTemplate {
    pub role: WalletRole,
    pub display_name: Option<&'static str>,
    pub recommended_trx: Option<u64>,
    pub description: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct BudgetProfile {
    pub kind: BudgetKind,
    pub title: &'static str,
    pub default_wallet_file: &'static str,
    pub budget_type: Option<&'static str>,
    pub wallets: Vec<WalletTemplate>,
    /// TRX sent to each provider by `distribute` when no amount is given.
    pub distribute_default_trx: u64,
    /// TRX frozen per provider by `rotate` / the strategy when no amount is given.
    pub freeze_default_trx: u64,
    /// TRX the main wallet must keep on top of what it distributes.
    pub reserve_trx: u64,
    /// Burned TRX avoided per token transfer paid with energy.
    pub saved_fee_per_transfer_trx: u64,
}

impl BudgetProfile {
    pub fn for_kind(kind: BudgetKind) -> Self {
        match kind {
            BudgetKind::Multi => Self::multi(),
            BudgetKind::SmallBudget => Self::small_budget(),
        }
    }

    pub fn multi() -> Self {
        let mut wallets = vec![WalletTemplate {
            role: WalletRole::Main,
            display_name: None,
            recommended_trx: None,
            description: None,
        }];
        wallets.extend((0..4).map(|_| WalletTemplate {
            role: WalletRole::EnergyProvider,
            display_name: None,
            recommended_trx: None,
            description: None,
        }));
        Self {
            kind: BudgetKind::Multi,
            title: "Multi-wallet energy manager",
            default_wallet_file: "multi_wallet_config.json",
            budget_type: None,
            wallets,
            distribute_default_trx: 50,
            freeze_default_trx: 30,
            reserve_trx: 10,
            saved_fee_per_transfer_trx: 15,
        }
    }

    pub fn small_budget() -> Self {
        Self {
            kind: BudgetKind::SmallBudget,
            title: "30 TRX small-budget energy manager",
            default_wallet_file: "small_budget_config.json",
            budget_type: Some("small_30trx"),
            wallets: vec![
                WalletTemplate {
                    role: WalletRole::Main,
                    display_name: Some("Main wallet"),
                    recommended_trx: Some(10),
                    description: Some("Holds USDT and emergency funds"),
                },
                WalletTemplate {
                    role: WalletRole::EnergyProvider,
                    display_name: Some("Energy wallet 1"),
                    recommended_trx: Some(10),
                    description: Some("Freezes TRX for energy"),
                },
                WalletTemplate {
                    role: WalletRole::EnergyProvider,
                    display_name: Some("Energy wallet 2"),
                    recommended_trx: Some(10),
                    description: Some("Freezes TRX for energy"),
                },
            ],
            distribute_default_trx: 10,
            freeze_default_trx: 10,
            reserve_trx: 5,
            saved_fee_per_transfer_trx: 15,
        }
    }

    pub fn wallet_count(&self) -> usize {
        self.wallets.len()
    }

    pub fn provider_count(&self) -> usize {
        self.wallets
            .iter()
            .filter(|w| w.role == WalletRole::EnergyProvider)
            .count()
    }
}

/// `wallet_A`, `wallet_B`, … then `wallet_27`, `wallet_28`, … past `Z`.
pub fn wallet_name(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => format!("wallet_{}", char::from(b'A' + i)),
        _ => format!("wallet_{}", index + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_have_expected_shape() {
        let m = BudgetProfile::multi();
        assert_eq!(m.wallet_count(), 5);
        assert_eq!(m.provider_count(), 4);
        assert_eq!(m.wallets[0].role, WalletRole::Main);

        let s = BudgetProfile::small_budget();
        assert_eq!(s.wallet_count(), 3);
        assert_eq!(s.provider_count(), 2);
        assert_eq!(s.reserve_trx, 5);
        assert!(s.wallets.iter().all(|w| w.display_name.is_some()));
    }

    #[test]
    fn wallet_names_follow_letters() {
        assert_eq!(wallet_name(0), "wallet_A");
        assert_eq!(wallet_name(4), "wallet_E");
        assert_eq!(wallet_name(25), "wallet_Z");
        assert_eq!(wallet_name(26), "wallet_27");
    }
}
