use alloy::primitives::U256;
use anyhow::Result;
use e2e::fake_node::FakeTronNode;
use e2e::util::{TEST_API_KEY, http_manager, token_contract, wallet_address};
use manager::amount::trx_to_sun;
use manager::history::TxKind;
use manager::ops::AccountStatus;
use manager::profile::BudgetProfile;
use tron::protocol::{ContractType, ResourceCode};
use tron::{NodeErrorKind, classify_error};

#[tokio::test]
async fn trx_transfer_carries_memo_and_api_key() -> Result<()> {
    let node = FakeTronNode::start().await?;
    let dir = tempfile::tempdir()?;
    let mut m = http_manager(&node, dir.path(), BudgetProfile::small_budget())?;
    let a = wallet_address(&m, "wallet_A")?;
    let b = wallet_address(&m, "wallet_B")?;
    node.fund(a, trx_to_sun(5));

    assert_eq!(m.status("wallet_B").await?, AccountStatus::NotActivated);
    let txid = m.send_trx("wallet_A", b, trx_to_sun(2), Some("rent")).await?;

    let sent = node.broadcasts();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].txid, txid);
    assert_eq!(sent[0].contract, ContractType::TransferContract);
    assert_eq!(sent[0].memo, b"rent".to_vec());
    assert_eq!(node.account(b).unwrap_or_default().balance_sun, trx_to_sun(2));
    assert_eq!(m.status("wallet_B").await?, AccountStatus::Activated);

    let keys = node.api_keys_seen();
    assert!(!keys.is_empty());
    assert!(keys.iter().all(|k| k.as_deref() == Some(TEST_API_KEY)));

    let history = m.history_list()?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, TxKind::TrxTransfer);
    assert_eq!(history[0].txid, txid);
    assert_eq!(history[0].amount, "2.000000 TRX");
    Ok(())
}

#[tokio::test]
async fn token_transfer_sets_fee_limit_and_moves_balance() -> Result<()> {
    let node = FakeTronNode::start().await?;
    let dir = tempfile::tempdir()?;
    let mut m = http_manager(&node, dir.path(), BudgetProfile::small_budget())?;
    let a = wallet_address(&m, "wallet_A")?;
    let c = wallet_address(&m, "wallet_C")?;
    node.fund(a, trx_to_sun(20));
    node.deploy_token(token_contract(), &[(a, U256::from(5_000_000u64))]);

    assert_eq!(m.token_balance("wallet_A").await?, U256::from(5_000_000u64));
    let txid = m
        .send_token("wallet_A", c, U256::from(1_250_000u64))
        .await?;

    let sent = node.broadcasts();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].txid, txid);
    assert_eq!(sent[0].contract, ContractType::TriggerSmartContract);
    assert!(sent[0].fee_limit > 0);
    assert!(sent[0].fee_limit <= 10_000_000);
    assert_eq!(node.token_balance(a), U256::from(3_750_000u64));
    assert_eq!(node.token_balance(c), U256::from(1_250_000u64));
    assert_eq!(m.token_balance("wallet_C").await?, U256::from(1_250_000u64));
    assert_eq!(m.history_list()?[0].amount, "1.250000 USDT");
    Ok(())
}

#[tokio::test]
async fn node_rejections_are_classified() -> Result<()> {
    let node = FakeTronNode::start().await?;
    let dir = tempfile::tempdir()?;
    let mut m = http_manager(&node, dir.path(), BudgetProfile::small_budget())?;
    let a = wallet_address(&m, "wallet_A")?;
    let b = wallet_address(&m, "wallet_B")?;
    node.fund(a, trx_to_sun(1));

    let err = m
        .send_trx("wallet_A", b, trx_to_sun(10), None)
        .await
        .unwrap_err();
    assert_eq!(classify_error(&err), NodeErrorKind::InsufficientBalance);

    let err = m
        .freeze("wallet_B", trx_to_sun(1), ResourceCode::Energy)
        .await
        .unwrap_err();
    assert_eq!(classify_error(&err), NodeErrorKind::AccountNotActivated);

    let err = m
        .unfreeze("wallet_A", Some(trx_to_sun(1)), ResourceCode::Energy)
        .await
        .unwrap_err();
    assert_eq!(classify_error(&err), NodeErrorKind::NoFrozenBalance);

    assert!(node.broadcasts().is_empty());
    assert!(m.history_list()?.is_empty());
    Ok(())
}
