use anyhow::{Context, Result};
use std::time::Duration;
use tron::protocol::ResourceCode;
use tron::{TronAddress, TronHttp, TronWallet, sender};

fn main() -> Result<()> {
    let api_url =
        std::env::var("TRON_API_URL").unwrap_or_else(|_| "https://nile.trongrid.io".to_string());
    let pk = std::env::var("TRON_PRIVATE_KEY_HEX").context("missing TRON_PRIVATE_KEY_HEX")?;
    let to = std::env::var("TRON_TO").ok();
    let do_delegate = std::env::var("TRON_DO_DELEGATE").ok().is_some();

    let wallet = TronWallet::from_hex(&pk).context("TronWallet::from_hex")?;

    let rt = tokio::runtime::Runtime::new().context("tokio runtime")?;
    rt.block_on(async move {
        let http = TronHttp::new(
            &api_url,
            std::env::var("TRON_API_KEY").ok().as_deref(),
            Duration::from_secs(20),
        )?;

        let head = http.get_now_block().await.context("getnowblock")?;
        println!("head block: {}", head.block_header.raw_data.number);

        let addr = wallet.address();
        let acct = http.get_account(addr).await.context("getaccount")?;
        println!("wallet: {addr} balance_sun={}", acct.balance);

        let to_addr = match to {
            Some(s) => TronAddress::parse_text(&s).context("parse TRON_TO")?,
            None => addr,
        };

        println!("broadcasting transfer: to={to_addr} amount_sun=1");
        let signed =
            sender::build_and_sign_transfer_contract(&http, &wallet, to_addr, 1, Some("smoke"))
                .await?;
        let txid = sender::broadcast(&http, &signed).await?;
        println!("txid={txid}");

        // Wait until tx_info has a block number.
        let mut tx_block = 0i64;
        for _ in 0..60 {
            let info = http.get_transaction_info_by_id(signed.txid).await?;
            if info.block_number > 0 {
                tx_block = info.block_number;
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        println!("tx block_number={tx_block}");

        if do_delegate {
            let receiver = to_addr;
            println!(
                "broadcasting delegate: receiver={receiver} balance_sun=1000000 resource=ENERGY"
            );
            let signed = sender::build_and_sign_delegate_resource_contract(
                &http,
                &wallet,
                receiver,
                ResourceCode::Energy,
                1_000_000,
                false,
                0,
            )
            .await?;
            let txid = sender::broadcast(&http, &signed).await?;
            println!("delegate txid={txid}");
        }

        Ok::<_, anyhow::Error>(())
    })?;

    Ok(())
}
