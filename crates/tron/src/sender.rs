use super::http::{NodeTransaction, TronHttp};
use super::protocol::{ContractType, ResourceCode, Transaction, contract_owner, transaction};
use super::resources::{parse_chain_fees, quote_fee_limit_sun};
use super::{TronAddress, TxSigner};
use anyhow::{Context, Result};
use prost::Message;
use sha2::{Digest, Sha256};

/// Used when the node's constant call reports zero energy for a state-changing call.
pub const FALLBACK_ENERGY_REQUIRED: u64 = 50_000;

#[derive(Debug, Clone, Copy)]
pub struct FeePolicy {
    /// Cap (sun) applied after headroom.
    pub fee_limit_cap_sun: u64,
    /// Extra headroom applied as parts-per-million.
    pub fee_limit_headroom_ppm: u64,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            fee_limit_cap_sun: 10_000_000,
            fee_limit_headroom_ppm: 200_000,
        }
    }
}

impl FeePolicy {
    pub fn apply(&self, base: u64) -> u64 {
        let headroom = base.saturating_mul(self.fee_limit_headroom_ppm.min(1_000_000)) / 1_000_000;
        base.saturating_add(headroom).min(self.fee_limit_cap_sun)
    }
}

#[derive(Debug, Clone)]
pub struct SignedTronTx {
    pub tx: Transaction,
    /// `sha256(raw_data_bytes)`.
    pub txid: [u8; 32],
    pub fee_limit_sun: u64,
    pub energy_required: u64,
    pub tx_size_bytes: u64,
}

impl SignedTronTx {
    pub fn txid_hex(&self) -> String {
        hex::encode(self.txid)
    }

    pub fn encode(&self) -> Vec<u8> {
        self.tx.encode_to_vec()
    }
}

/// Decodes a node-built skeleton and checks it is the contract we asked for, owned by `signer`.
pub fn decode_node_tx(
    node_tx: &NodeTransaction,
    signer: &dyn TxSigner,
    expected: ContractType,
) -> Result<transaction::Raw> {
    let raw_bytes = hex::decode(node_tx.raw_data_hex.trim()).context("decode raw_data_hex")?;
    let node_txid = hex::encode(Sha256::digest(&raw_bytes));
    if !node_tx.txid.eq_ignore_ascii_case(&node_txid) {
        anyhow::bail!(
            "node txID {} does not match raw_data (sha256={node_txid})",
            node_tx.txid
        );
    }
    let raw = transaction::Raw::decode(raw_bytes.as_slice()).context("decode transaction raw")?;
    let owner = contract_owner(&raw, expected)?;
    if owner.as_slice() != signer.address().prefixed_bytes().as_slice() {
        anyhow::bail!(
            "node built {expected:?} for owner {}, expected {}",
            hex::encode(&owner),
            signer.address().to_hex41()
        );
    }
    Ok(raw)
}

/// Sets `fee_limit`, encodes, signs and wraps `raw`. Returns the signed tx, its id and its size.
pub fn sign_raw_with_fee_limit(
    signer: &dyn TxSigner,
    mut raw: transaction::Raw,
    fee_limit_sun: i64,
) -> Result<(Transaction, [u8; 32], u64)> {
    raw.fee_limit = fee_limit_sun.max(0);

    let raw_bytes = raw.encode_to_vec();
    let txid = Sha256::digest(&raw_bytes);
    let sig65 = signer.sign_raw_data(&raw_bytes)?;

    let signed = Transaction {
        raw_data: Some(raw),
        signature: vec![sig65],
        ret: Vec::new(),
    };

    let size = u64::try_from(signed.encode_to_vec().len()).unwrap_or(u64::MAX);

    let mut out = [0u8; 32];
    out.copy_from_slice(&txid);
    Ok((signed, out, size))
}

fn sign_plain(
    signer: &dyn TxSigner,
    node_tx: &NodeTransaction,
    expected: ContractType,
) -> Result<SignedTronTx> {
    let raw = decode_node_tx(node_tx, signer, expected)?;
    let (tx, txid, tx_size_bytes) = sign_raw_with_fee_limit(signer, raw, 0)?;
    Ok(SignedTronTx {
        tx,
        txid,
        fee_limit_sun: 0,
        energy_required: 0,
        tx_size_bytes,
    })
}

/// Builds and signs a native TRX transfer (`TransferContract`), with an optional memo in
/// `raw_data.data`.
pub async fn build_and_sign_transfer_contract(
    http: &TronHttp,
    signer: &dyn TxSigner,
    to: TronAddress,
    amount_sun: i64,
    memo: Option<&str>,
) -> Result<SignedTronTx> {
    let node_tx = http
        .create_transaction(signer.address(), to, amount_sun)
        .await
        .context("createtransaction")?;
    let mut raw = decode_node_tx(&node_tx, signer, ContractType::TransferContract)?;
    if let Some(memo) = memo.filter(|m| !m.is_empty()) {
        raw.data = memo.as_bytes().to_vec();
    }
    let (tx, txid, tx_size_bytes) = sign_raw_with_fee_limit(signer, raw, 0)?;
    Ok(SignedTronTx {
        tx,
        txid,
        fee_limit_sun: 0,
        energy_required: 0,
        tx_size_bytes,
    })
}

/// Builds and signs a FreezeBalanceV2 tx (Stake 2.0).
pub async fn build_and_sign_freeze_balance_v2(
    http: &TronHttp,
    signer: &dyn TxSigner,
    frozen_balance_sun: i64,
    resource: ResourceCode,
) -> Result<SignedTronTx> {
    let node_tx = http
        .freeze_balance_v2(signer.address(), frozen_balance_sun, resource)
        .await
        .context("freezebalancev2")?;
    sign_plain(signer, &node_tx, ContractType::FreezeBalanceV2Contract)
}

pub async fn build_and_sign_unfreeze_balance_v2(
    http: &TronHttp,
    signer: &dyn TxSigner,
    unfreeze_balance_sun: i64,
    resource: ResourceCode,
) -> Result<SignedTronTx> {
    let node_tx = http
        .unfreeze_balance_v2(signer.address(), unfreeze_balance_sun, resource)
        .await
        .context("unfreezebalancev2")?;
    sign_plain(signer, &node_tx, ContractType::UnfreezeBalanceV2Contract)
}

pub async fn build_and_sign_withdraw_expire_unfreeze(
    http: &TronHttp,
    signer: &dyn TxSigner,
) -> Result<SignedTronTx> {
    let node_tx = http
        .withdraw_expire_unfreeze(signer.address())
        .await
        .context("withdrawexpireunfreeze")?;
    sign_plain(signer, &node_tx, ContractType::WithdrawExpireUnfreezeContract)
}

/// Builds and signs a resource delegation (`DelegateResourceContract`) tx.
pub async fn build_and_sign_delegate_resource_contract(
    http: &TronHttp,
    signer: &dyn TxSigner,
    receiver: TronAddress,
    resource: ResourceCode,
    balance_sun: i64,
    lock: bool,
    lock_period: i64,
) -> Result<SignedTronTx> {
    let node_tx = http
        .delegate_resource(
            signer.address(),
            receiver,
            resource,
            balance_sun,
            lock,
            lock_period,
        )
        .await
        .context("delegateresource")?;
    sign_plain(signer, &node_tx, ContractType::DelegateResourceContract)
}

pub async fn build_and_sign_undelegate_resource_contract(
    http: &TronHttp,
    signer: &dyn TxSigner,
    receiver: TronAddress,
    resource: ResourceCode,
    balance_sun: i64,
) -> Result<SignedTronTx> {
    let node_tx = http
        .undelegate_resource(signer.address(), receiver, resource, balance_sun)
        .await
        .context("undelegateresource")?;
    sign_plain(signer, &node_tx, ContractType::UnDelegateResourceContract)
}

/// Builds and signs a TriggerSmartContract tx with a fee limit derived from chain parameters.
///
/// Many nodes require the account to hold enough TRX to cover `fee_limit` even when energy is
/// delegated, so the limit is computed as
/// `energy_required * getEnergyFee + tx_size_bytes * getTransactionFee`, plus headroom and cap.
pub async fn build_and_sign_trigger_smart_contract(
    http: &TronHttp,
    signer: &dyn TxSigner,
    contract: TronAddress,
    function_selector: &str,
    parameter: &[u8],
    call_value_sun: i64,
    fee_policy: FeePolicy,
) -> Result<SignedTronTx> {
    let chain_params = http.get_chain_parameters().await?;
    let fees = parse_chain_fees(&chain_params)?;
    let owner = signer.address();

    let estimate = http
        .trigger_constant_contract(owner, contract, function_selector, parameter)
        .await;
    let mut energy_required = match estimate {
        Ok(r) => u64::try_from(r.energy_used).unwrap_or(0),
        Err(err) => {
            tracing::warn!(err = %format!("{err:#}"), "energy estimate failed; using fallback");
            0
        }
    };
    if energy_required == 0 {
        energy_required = FALLBACK_ENERGY_REQUIRED;
    }

    let cap = i64::try_from(fee_policy.fee_limit_cap_sun).context("fee_limit cap out of range")?;
    let node_tx = http
        .trigger_smart_contract(
            owner,
            contract,
            function_selector,
            parameter,
            call_value_sun,
            cap,
        )
        .await
        .context("triggersmartcontract")?;
    let raw = decode_node_tx(&node_tx, signer, ContractType::TriggerSmartContract)?;

    // Two-pass sizing: the fee_limit varint itself changes the tx size (bandwidth fee).
    let (_signed0, _txid0, tx_size0) = sign_raw_with_fee_limit(signer, raw.clone(), 0)?;
    let fee_limit0 = fee_policy.apply(quote_fee_limit_sun(energy_required, tx_size0, fees));

    let (signed1, txid1, tx_size1) = sign_raw_with_fee_limit(
        signer,
        raw.clone(),
        i64::try_from(fee_limit0).context("fee_limit_sun out of range")?,
    )?;
    let fee_limit1 = fee_policy.apply(quote_fee_limit_sun(energy_required, tx_size1, fees));

    let (tx, txid, tx_size_bytes, fee_limit_sun) = if fee_limit1 == fee_limit0 {
        (signed1, txid1, tx_size1, fee_limit1)
    } else {
        let (signed2, txid2, tx_size2) = sign_raw_with_fee_limit(
            signer,
            raw,
            i64::try_from(fee_limit1).context("fee_limit_sun out of range")?,
        )?;
        (signed2, txid2, tx_size2, fee_limit1)
    };

    Ok(SignedTronTx {
        tx,
        txid,
        fee_limit_sun,
        energy_required,
        tx_size_bytes,
    })
}

/// Broadcasts a signed tx and returns its id (hex).
pub async fn broadcast(http: &TronHttp, signed: &SignedTronTx) -> Result<String> {
    http.broadcast_hex(&signed.encode())
        .await
        .context("broadcasthex")?;
    let txid = signed.txid_hex();
    tracing::info!(txid = %txid, fee_limit_sun = signed.fee_limit_sun, "broadcast ok");
    Ok(txid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TronWallet;
    use crate::protocol::{TransferContract, contract_entry};

    fn node_tx_for(owner: TronAddress) -> (NodeTransaction, transaction::Raw) {
        let transfer = TransferContract {
            owner_address: owner.prefixed_bytes().to_vec(),
            to_address: vec![0x41; 21],
            amount: 2_000_000,
        };
        let raw = transaction::Raw {
            ref_block_bytes: vec![0x01, 0x02],
            ref_block_hash: vec![0x0a; 8],
            expiration: 1_700_000_060_000,
            timestamp: 1_700_000_000_000,
            contract: vec![contract_entry(ContractType::TransferContract, &transfer)],
            ..Default::default()
        };
        let bytes = raw.encode_to_vec();
        let node_tx = NodeTransaction {
            txid: hex::encode(Sha256::digest(&bytes)),
            raw_data_hex: hex::encode(&bytes),
        };
        (node_tx, raw)
    }

    #[test]
    fn fee_policy_applies_headroom_then_cap() {
        let p = FeePolicy {
            fee_limit_cap_sun: 1_000,
            fee_limit_headroom_ppm: 100_000,
        };
        assert_eq!(p.apply(500), 550);
        assert_eq!(p.apply(950), 1_000);
    }

    #[test]
    fn decode_node_tx_accepts_own_transfer() {
        let w = TronWallet::random();
        let (node_tx, raw) = node_tx_for(w.address());
        let decoded = decode_node_tx(&node_tx, &w, ContractType::TransferContract).unwrap();
        assert_eq!(decoded, raw);
    }

    #[test]
    fn decode_node_tx_rejects_foreign_owner_and_wrong_type() {
        let w = TronWallet::random();
        let other = TronWallet::random();
        let (node_tx, _) = node_tx_for(other.address());
        assert!(decode_node_tx(&node_tx, &w, ContractType::TransferContract).is_err());

        let (node_tx, _) = node_tx_for(w.address());
        assert!(decode_node_tx(&node_tx, &w, ContractType::FreezeBalanceV2Contract).is_err());
    }

    #[test]
    fn decode_node_tx_rejects_txid_mismatch() {
        let w = TronWallet::random();
        let (mut node_tx, _) = node_tx_for(w.address());
        node_tx.txid = "00".repeat(32);
        assert!(decode_node_tx(&node_tx, &w, ContractType::TransferContract).is_err());
    }

    #[test]
    fn signing_with_fee_limit_patches_raw_and_txid() {
        let w = TronWallet::random();
        let (_, raw) = node_tx_for(w.address());
        let (tx0, id0, size0) = sign_raw_with_fee_limit(&w, raw.clone(), 0).unwrap();
        let (tx1, id1, size1) = sign_raw_with_fee_limit(&w, raw, 5_000_000).unwrap();
        assert_ne!(id0, id1);
        assert!(size1 > size0);
        let raw1 = tx1.raw_data.unwrap();
        assert_eq!(raw1.fee_limit, 5_000_000);
        assert_eq!(id1.as_slice(), Sha256::digest(raw1.encode_to_vec()).as_slice());
        assert_eq!(tx0.signature.len(), 1);
        assert_eq!(tx0.signature[0].len(), 65);
    }
}
