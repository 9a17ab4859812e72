use anyhow::Result;
use e2e::fake_node::{FakeTronNode, TOTAL_ENERGY_LIMIT, TOTAL_ENERGY_WEIGHT_TRX};
use e2e::util::{http_manager, wallet_address};
use manager::amount::trx_to_sun;
use manager::profile::BudgetProfile;
use manager::rotation::{DelegateOutcome, WalletOutcome};
use tron::protocol::ContractType;
use tron::resources::energy_for_frozen_sun;
use tron::{ResourceStakeTotals, SUN_PER_TRX};

fn totals() -> ResourceStakeTotals {
    ResourceStakeTotals {
        total_limit: TOTAL_ENERGY_LIMIT,
        total_weight: TOTAL_ENERGY_WEIGHT_TRX * SUN_PER_TRX,
    }
}

#[tokio::test]
async fn rotation_freezes_and_delegates_signed_transactions() -> Result<()> {
    let node = FakeTronNode::start().await?;
    let dir = tempfile::tempdir()?;
    let mut m = http_manager(&node, dir.path(), BudgetProfile::multi())?;

    let main = wallet_address(&m, "wallet_A")?;
    let b = wallet_address(&m, "wallet_B")?;
    let c = wallet_address(&m, "wallet_C")?;
    node.fund(main, trx_to_sun(1));
    node.fund(b, trx_to_sun(40));
    node.fund(c, trx_to_sun(30));

    let report = m.rotate(trx_to_sun(30)).await?;
    assert_eq!(report.wallets.len(), 4);
    assert_eq!(report.frozen_count(), 2);
    assert_eq!(report.delegated_count(), 2);
    assert!(matches!(
        report.wallets[2].outcome,
        WalletOutcome::Skipped { balance_sun: 0 }
    ));

    let b_acc = node.account(b).unwrap_or_default();
    assert_eq!(b_acc.balance_sun, trx_to_sun(10));
    assert_eq!(b_acc.frozen_energy_sun, 0);
    assert_eq!(b_acc.delegated_energy_sun, trx_to_sun(30));
    let main_acc = node.account(main).unwrap_or_default();
    assert_eq!(main_acc.acquired_energy_sun, trx_to_sun(60));

    let kinds: Vec<_> = node.broadcasts().iter().map(|b| (b.contract, b.owner)).collect();
    assert_eq!(
        kinds,
        vec![
            (ContractType::FreezeBalanceV2Contract, b),
            (ContractType::DelegateResourceContract, b),
            (ContractType::FreezeBalanceV2Contract, c),
            (ContractType::DelegateResourceContract, c),
        ]
    );
    for w in &report.wallets[..2] {
        let WalletOutcome::Frozen {
            freeze_txid,
            delegate: DelegateOutcome::Delegated { txid },
        } = &w.outcome
        else {
            panic!("unexpected outcome {:?}", w.outcome);
        };
        assert!(node.broadcasts().iter().any(|b| &b.txid == freeze_txid));
        assert!(node.broadcasts().iter().any(|b| &b.txid == txid));
    }
    assert_eq!(m.history_list()?.len(), 4);
    assert_eq!(m.store().get("wallet_B")?.frozen_sun, trx_to_sun(30));

    let overview = m.overview().await?;
    assert_eq!(
        overview.wallets[0].energy_limit,
        energy_for_frozen_sun(trx_to_sun(60), totals())
    );
    assert_eq!(overview.wallets[0].bandwidth_available, 600);
    Ok(())
}

#[tokio::test]
async fn rejected_broadcast_does_not_stop_the_rotation() -> Result<()> {
    let node = FakeTronNode::start().await?;
    let dir = tempfile::tempdir()?;
    let mut m = http_manager(&node, dir.path(), BudgetProfile::small_budget())?;

    let main = wallet_address(&m, "wallet_A")?;
    let b = wallet_address(&m, "wallet_B")?;
    let c = wallet_address(&m, "wallet_C")?;
    node.fund(main, trx_to_sun(1));
    node.fund(b, trx_to_sun(10));
    node.fund(c, trx_to_sun(10));
    node.reject_broadcasts_from(b);

    let report = m.rotate(trx_to_sun(10)).await?;
    let WalletOutcome::FreezeFailed { error } = &report.wallets[0].outcome else {
        panic!("unexpected outcome {:?}", report.wallets[0].outcome);
    };
    assert!(error.contains("SERVER_BUSY"), "{error}");
    assert_eq!(report.delegated_count(), 1);
    assert_eq!(node.account(b).unwrap_or_default().balance_sun, trx_to_sun(10));
    assert_eq!(
        node.account(main).unwrap_or_default().acquired_energy_sun,
        trx_to_sun(10)
    );
    Ok(())
}

#[tokio::test]
async fn small_budget_strategy_end_to_end() -> Result<()> {
    let node = FakeTronNode::start().await?;
    let dir = tempfile::tempdir()?;
    let mut m = http_manager(&node, dir.path(), BudgetProfile::small_budget())?;
    let main = wallet_address(&m, "wallet_A")?;
    node.fund(main, trx_to_sun(30));

    let report = m.run_small_budget_strategy().await?;
    assert!(report.completed(), "{report:?}");
    assert_eq!(node.account(main).unwrap_or_default().balance_sun, trx_to_sun(10));
    assert_eq!(
        node.account(main).unwrap_or_default().acquired_energy_sun,
        trx_to_sun(20)
    );
    for name in ["wallet_B", "wallet_C"] {
        let acc = node.account(wallet_address(&m, name)?).unwrap_or_default();
        assert_eq!(acc.balance_sun, 0);
        assert_eq!(acc.delegated_energy_sun, trx_to_sun(10));
    }
    assert_eq!(node.broadcasts().len(), 6);

    let plan = m.plan(65_000).await?;
    assert_eq!(plan.energy_per_trx, energy_for_frozen_sun(SUN_PER_TRX, totals()));
    Ok(())
}

#[tokio::test]
async fn reclaim_unfreeze_and_withdraw_cycle() -> Result<()> {
    let node = FakeTronNode::start().await?;
    let dir = tempfile::tempdir()?;
    let mut m = http_manager(&node, dir.path(), BudgetProfile::small_budget())?;
    let main = wallet_address(&m, "wallet_A")?;
    let b = wallet_address(&m, "wallet_B")?;
    node.fund(main, trx_to_sun(1));
    node.fund(b, trx_to_sun(10));

    m.rotate(trx_to_sun(10)).await?;
    assert!(m.undelegate("wallet_B", None).await?.is_some());
    assert_eq!(node.account(main).unwrap_or_default().acquired_energy_sun, 0);

    assert!(m.unfreeze("wallet_B", None, tron::protocol::ResourceCode::Energy).await?.is_some());
    assert_eq!(m.store().get("wallet_B")?.frozen_sun, 0);
    m.withdraw("wallet_B").await?;
    assert_eq!(node.account(b).unwrap_or_default().balance_sun, trx_to_sun(10));

    let err = m.withdraw("wallet_B").await.unwrap_err();
    assert!(format!("{err:#}").contains("no unFreeze balance"));
    Ok(())
}
