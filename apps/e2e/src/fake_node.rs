//! In-process stand-in for a java-tron full node's `/wallet/*` HTTP API.
//!
//! Builder endpoints return real protobuf `raw_data` with `txID = sha256(raw_data)`. State only
//! changes on `/wallet/broadcasthex`, after the signature has been recovered to the contract
//! owner, so tests exercise the whole build-verify-sign-broadcast path.

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use prost::Message;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tron::TronAddress;
use tron::abi::{TRC20_BALANCE_OF, TRC20_TRANSFER, selector};
use tron::protocol::{
    ContractType, DelegateResourceContract, FreezeBalanceV2Contract, ResourceCode, Transaction,
    TransferContract, TriggerSmartContract, UnDelegateResourceContract, UnfreezeBalanceV2Contract,
    WithdrawExpireUnfreezeContract, contract_entry, transaction,
};
use tron::resources::{ResourceStakeTotals, energy_for_frozen_sun};

pub const TOTAL_ENERGY_LIMIT: u64 = 180_000_000_000;
/// Network energy stake in whole TRX, as the HTTP API reports it.
pub const TOTAL_ENERGY_WEIGHT_TRX: u64 = 19_000_000_000;
pub const ENERGY_FEE_SUN: i64 = 210;
pub const TX_FEE_SUN_PER_BYTE: i64 = 1_000;
/// Energy reported by constant calls to the token's `transfer`.
pub const TOKEN_TRANSFER_ENERGY: i64 = 29_650;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FakeAccount {
    pub balance_sun: u64,
    pub frozen_energy_sun: u64,
    pub frozen_bandwidth_sun: u64,
    /// Energy stake delegated to other accounts.
    pub delegated_energy_sun: u64,
    /// Energy stake received from other accounts.
    pub acquired_energy_sun: u64,
    pub unfreezing_sun: u64,
}

/// One accepted broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    pub txid: String,
    pub contract: ContractType,
    pub owner: TronAddress,
    pub memo: Vec<u8>,
    pub fee_limit: i64,
}

#[derive(Default)]
struct NodeState {
    accounts: HashMap<TronAddress, FakeAccount>,
    token: Option<TronAddress>,
    token_balances: HashMap<TronAddress, U256>,
    /// Energy stake per `(owner, receiver)`.
    delegations: HashMap<(TronAddress, TronAddress), u64>,
    broadcasts: Vec<Broadcast>,
    reject_broadcast_from: HashSet<TronAddress>,
    api_keys: Vec<Option<String>>,
    block: i64,
}

type Shared = Arc<Mutex<NodeState>>;

fn lock(s: &Shared) -> std::sync::MutexGuard<'_, NodeState> {
    s.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct FakeTronNode {
    pub base_url: String,
    state: Shared,
    handle: JoinHandle<()>,
}

impl FakeTronNode {
    pub async fn start() -> Result<Self> {
        let state: Shared = Arc::new(Mutex::new(NodeState {
            block: 60_000_000,
            ..Default::default()
        }));

        let app = Router::new()
            .route("/wallet/getaccount", post(get_account))
            .route("/wallet/getaccountresource", post(get_account_resource))
            .route("/wallet/getchainparameters", post(get_chain_parameters))
            .route("/wallet/getnowblock", post(get_now_block))
            .route("/wallet/getcandelegatedmaxsize", post(get_can_delegated_max_size))
            .route("/wallet/getdelegatedresourcev2", post(get_delegated_resource_v2))
            .route("/wallet/createtransaction", post(create_transaction))
            .route("/wallet/freezebalancev2", post(freeze_balance_v2))
            .route("/wallet/unfreezebalancev2", post(unfreeze_balance_v2))
            .route("/wallet/withdrawexpireunfreeze", post(withdraw_expire_unfreeze))
            .route("/wallet/delegateresource", post(delegate_resource))
            .route("/wallet/undelegateresource", post(undelegate_resource))
            .route("/wallet/triggersmartcontract", post(trigger_smart_contract))
            .route("/wallet/triggerconstantcontract", post(trigger_constant_contract))
            .route("/wallet/broadcasthex", post(broadcast_hex))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind fake tron node")?;
        let addr: SocketAddr = listener.local_addr().context("fake tron node local_addr")?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            state,
            handle,
        })
    }

    pub fn fund(&self, addr: TronAddress, sun: u64) {
        lock(&self.state).accounts.entry(addr).or_default().balance_sun += sun;
    }

    pub fn account(&self, addr: TronAddress) -> Option<FakeAccount> {
        lock(&self.state).accounts.get(&addr).copied()
    }

    /// Deploys a TRC20 token at `contract` with `balances`.
    pub fn deploy_token(&self, contract: TronAddress, balances: &[(TronAddress, U256)]) {
        let mut s = lock(&self.state);
        s.token = Some(contract);
        s.token_balances = balances.iter().copied().collect();
    }

    pub fn token_balance(&self, addr: TronAddress) -> U256 {
        lock(&self.state)
            .token_balances
            .get(&addr)
            .copied()
            .unwrap_or_default()
    }

    pub fn reject_broadcasts_from(&self, addr: TronAddress) {
        lock(&self.state).reject_broadcast_from.insert(addr);
    }

    pub fn broadcasts(&self) -> Vec<Broadcast> {
        lock(&self.state).broadcasts.clone()
    }

    /// `TRON-PRO-API-KEY` header of every `getaccount` request.
    pub fn api_keys_seen(&self) -> Vec<Option<String>> {
        lock(&self.state).api_keys.clone()
    }
}

impl Drop for FakeTronNode {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn reply(r: Result<Value>) -> Json<Value> {
    Json(r.unwrap_or_else(|e| json!({ "Error": format!("{e:#}") })))
}

fn field_addr(body: &Value, key: &str) -> Result<TronAddress> {
    let s = body
        .get(key)
        .and_then(Value::as_str)
        .with_context(|| format!("missing {key}"))?;
    TronAddress::parse_text(s).with_context(|| format!("invalid {key}"))
}

fn field_i64(body: &Value, key: &str) -> Result<i64> {
    body.get(key)
        .and_then(Value::as_i64)
        .with_context(|| format!("missing {key}"))
}

fn field_resource(body: &Value) -> Result<ResourceCode> {
    match body.get("resource").and_then(Value::as_str) {
        None => Ok(ResourceCode::Bandwidth),
        Some(s) => ResourceCode::parse(s),
    }
}

fn positive(label: &str, v: i64) -> Result<u64> {
    if v <= 0 {
        anyhow::bail!("{label} must be positive");
    }
    Ok(v as u64)
}

fn frozen_mut(a: &mut FakeAccount, resource: ResourceCode) -> &mut u64 {
    match resource {
        ResourceCode::Energy => &mut a.frozen_energy_sun,
        _ => &mut a.frozen_bandwidth_sun,
    }
}

impl NodeState {
    fn existing(&self, addr: TronAddress) -> Result<FakeAccount> {
        self.accounts
            .get(&addr)
            .copied()
            .with_context(|| format!("account [{addr}] does not exist"))
    }

    fn totals() -> ResourceStakeTotals {
        ResourceStakeTotals {
            total_limit: TOTAL_ENERGY_LIMIT,
            total_weight: TOTAL_ENERGY_WEIGHT_TRX * tron::SUN_PER_TRX,
        }
    }

    /// Wraps one contract into an unsigned node transaction response.
    fn build<M: Message>(&mut self, ty: ContractType, msg: &M) -> Value {
        self.block += 1;
        let raw = transaction::Raw {
            ref_block_bytes: (self.block as u16).to_be_bytes().to_vec(),
            ref_block_hash: Sha256::digest(self.block.to_be_bytes())[8..16].to_vec(),
            expiration: 1_700_000_060_000 + self.block,
            timestamp: 1_700_000_000_000 + self.block,
            contract: vec![contract_entry(ty, msg)],
            ..Default::default()
        };
        let raw_bytes = raw.encode_to_vec();
        json!({
            "visible": true,
            "txID": hex::encode(Sha256::digest(&raw_bytes)),
            "raw_data_hex": hex::encode(&raw_bytes),
        })
    }

    fn trc20_call(&self, contract: TronAddress, sig: &str, param: &[u8]) -> Result<()> {
        if self.token != Some(contract) {
            anyhow::bail!("contract {contract} is not deployed");
        }
        if sig != TRC20_TRANSFER && sig != TRC20_BALANCE_OF {
            anyhow::bail!("unsupported function {sig}");
        }
        if param.len() % 32 != 0 {
            anyhow::bail!("parameter is not a sequence of 32-byte words");
        }
        Ok(())
    }

    fn apply(&mut self, tx: &Transaction) -> Result<Broadcast> {
        let raw = tx.raw_data.as_ref().context("transaction has no raw_data")?;
        let raw_bytes = raw.encode_to_vec();
        let txid = Sha256::digest(&raw_bytes);
        let c = raw.contract.first().context("transaction has no contract")?;
        let ty =
            ContractType::try_from(c.r#type).map_err(|_| anyhow::anyhow!("bad contract type"))?;
        let param = c.parameter.as_ref().context("contract has no parameter")?;
        let v = param.value.as_slice();

        let sig = tx.signature.first().context("transaction is not signed")?;
        if sig.len() != 65 {
            anyhow::bail!("SIGERROR: signature must be 65 bytes");
        }
        let signature = Signature::from_slice(&sig[..64]).context("SIGERROR: bad signature")?;
        let recid = RecoveryId::from_byte(sig[64].wrapping_sub(27)).context("SIGERROR: bad v")?;
        let vk = VerifyingKey::recover_from_prehash(&txid, &signature, recid)
            .context("SIGERROR: recover")?;
        let signer = TronAddress::from_verifying_key(&vk);

        let owner_bytes = tron::protocol::contract_owner(raw, ty)?;
        let owner = TronAddress::from_prefixed_bytes(&owner_bytes)?;
        if owner != signer {
            anyhow::bail!("SIGERROR: signed by {signer}, owner is {owner}");
        }
        if self.reject_broadcast_from.contains(&owner) {
            anyhow::bail!("SERVER_BUSY: node overloaded");
        }

        let mut from = self.existing(owner)?;
        match ty {
            ContractType::TransferContract => {
                let m = TransferContract::decode(v)?;
                let to = TronAddress::from_prefixed_bytes(&m.to_address)?;
                let amount = positive("amount", m.amount)?;
                if from.balance_sun < amount {
                    anyhow::bail!("Validate TransferContract error, balance is not sufficient.");
                }
                from.balance_sun -= amount;
                self.accounts.insert(owner, from);
                self.accounts.entry(to).or_default().balance_sun += amount;
            }
            ContractType::FreezeBalanceV2Contract => {
                let m = FreezeBalanceV2Contract::decode(v)?;
                let amount = positive("frozenBalance", m.frozen_balance)?;
                let resource = ResourceCode::try_from(m.resource)
                    .map_err(|_| anyhow::anyhow!("bad resource"))?;
                if from.balance_sun < amount {
                    anyhow::bail!("frozenBalance must be less than or equal to accountBalance");
                }
                from.balance_sun -= amount;
                *frozen_mut(&mut from, resource) += amount;
                self.accounts.insert(owner, from);
            }
            ContractType::UnfreezeBalanceV2Contract => {
                let m = UnfreezeBalanceV2Contract::decode(v)?;
                let amount = positive("unfreezeBalance", m.unfreeze_balance)?;
                let resource = ResourceCode::try_from(m.resource)
                    .map_err(|_| anyhow::anyhow!("bad resource"))?;
                let frozen = frozen_mut(&mut from, resource);
                if *frozen < amount {
                    anyhow::bail!("Invalid unfreeze_balance, no frozen balance");
                }
                *frozen -= amount;
                from.unfreezing_sun += amount;
                self.accounts.insert(owner, from);
            }
            ContractType::WithdrawExpireUnfreezeContract => {
                WithdrawExpireUnfreezeContract::decode(v)?;
                if from.unfreezing_sun == 0 {
                    anyhow::bail!("no unFreeze balance to withdraw");
                }
                from.balance_sun += from.unfreezing_sun;
                from.unfreezing_sun = 0;
                self.accounts.insert(owner, from);
            }
            ContractType::DelegateResourceContract => {
                let m = DelegateResourceContract::decode(v)?;
                let amount = positive("delegateBalance", m.balance)?;
                let receiver = TronAddress::from_prefixed_bytes(&m.receiver_address)?;
                if receiver == owner {
                    anyhow::bail!("receiverAddress must not be the same as ownerAddress");
                }
                if from.frozen_energy_sun < amount {
                    anyhow::bail!(
                        "delegateBalance must be less than or equal to available \
                         FreezeEnergyV2 balance"
                    );
                }
                self.existing(receiver)?;
                from.frozen_energy_sun -= amount;
                from.delegated_energy_sun += amount;
                self.accounts.insert(owner, from);
                self.accounts.entry(receiver).or_default().acquired_energy_sun += amount;
                *self.delegations.entry((owner, receiver)).or_default() += amount;
            }
            ContractType::UnDelegateResourceContract => {
                let m = UnDelegateResourceContract::decode(v)?;
                let amount = positive("unDelegateBalance", m.balance)?;
                let receiver = TronAddress::from_prefixed_bytes(&m.receiver_address)?;
                let pair = self.delegations.entry((owner, receiver)).or_default();
                if *pair < amount {
                    anyhow::bail!("insufficient delegatedFrozenBalance(Energy)");
                }
                *pair -= amount;
                from.delegated_energy_sun -= amount;
                from.frozen_energy_sun += amount;
                self.accounts.insert(owner, from);
                let r = self.accounts.entry(receiver).or_default();
                r.acquired_energy_sun = r.acquired_energy_sun.saturating_sub(amount);
            }
            ContractType::TriggerSmartContract => {
                let m = TriggerSmartContract::decode(v)?;
                let contract = TronAddress::from_prefixed_bytes(&m.contract_address)?;
                if self.token != Some(contract) || m.data.len() != 4 + 64 {
                    anyhow::bail!("REVERT opcode executed");
                }
                if m.data[..4] != selector(TRC20_TRANSFER) {
                    anyhow::bail!("REVERT opcode executed");
                }
                let to = TronAddress::from_evm(Address::from_slice(&m.data[16..36]));
                let amount = U256::from_be_slice(&m.data[36..68]);
                let have = self.token_balances.get(&owner).copied().unwrap_or_default();
                if have < amount {
                    anyhow::bail!("REVERT opcode executed");
                }
                if raw.fee_limit <= 0 {
                    anyhow::bail!("fee_limit must be set for TriggerSmartContract");
                }
                self.token_balances.insert(owner, have - amount);
                *self.token_balances.entry(to).or_default() += amount;
            }
            other => anyhow::bail!("unsupported contract {other:?}"),
        }

        Ok(Broadcast {
            txid: hex::encode(txid),
            contract: ty,
            owner,
            memo: raw.data.clone(),
            fee_limit: raw.fee_limit,
        })
    }
}

impl NodeState {
    fn account_json(&self, body: &Value) -> Result<Value> {
        let addr = field_addr(body, "address")?;
        let Some(a) = self.accounts.get(&addr) else {
            return Ok(json!({}));
        };
        Ok(json!({
            "address": addr.to_base58check(),
            "balance": a.balance_sun,
            "frozenV2": [
                { "amount": a.frozen_bandwidth_sun },
                { "type": "ENERGY", "amount": a.frozen_energy_sun },
                { "type": "TRON_POWER" }
            ],
            "account_resource": {
                "delegated_frozenV2_balance_for_energy": a.delegated_energy_sun
            }
        }))
    }

    fn account_resource_json(&self, body: &Value) -> Result<Value> {
        let addr = field_addr(body, "address")?;
        let a = self.accounts.get(&addr).copied().unwrap_or_default();
        let energy_limit =
            energy_for_frozen_sun(a.frozen_energy_sun + a.acquired_energy_sun, Self::totals());
        Ok(json!({
            "freeNetLimit": 600,
            "EnergyLimit": energy_limit,
            "TotalEnergyLimit": TOTAL_ENERGY_LIMIT,
            "TotalEnergyWeight": TOTAL_ENERGY_WEIGHT_TRX
        }))
    }

    fn delegated_resource_json(&self, body: &Value) -> Result<Value> {
        let from = field_addr(body, "fromAddress")?;
        let to = field_addr(body, "toAddress")?;
        let amount = self.delegations.get(&(from, to)).copied().unwrap_or(0);
        if amount == 0 {
            return Ok(json!({}));
        }
        Ok(json!({
            "delegatedResource": [{
                "from": from.to_base58check(),
                "to": to.to_base58check(),
                "frozen_balance_for_energy": amount
            }]
        }))
    }

    fn can_delegate_max_json(&self, body: &Value) -> Result<Value> {
        let addr = field_addr(body, "owner_address")?;
        let ty = body.get("type").and_then(Value::as_i64).unwrap_or(0);
        let a = self.accounts.get(&addr).copied().unwrap_or_default();
        let max = if ty == ResourceCode::Energy as i64 {
            a.frozen_energy_sun
        } else {
            a.frozen_bandwidth_sun
        };
        // The node omits zero fields.
        if max == 0 {
            return Ok(json!({}));
        }
        Ok(json!({ "max_size": max }))
    }

    fn create_transaction(&mut self, body: &Value) -> Result<Value> {
        let owner = field_addr(body, "owner_address")?;
        let to = field_addr(body, "to_address")?;
        let amount = field_i64(body, "amount")?;
        let a = self.existing(owner)?;
        if a.balance_sun < positive("amount", amount)? {
            anyhow::bail!("Validate TransferContract error, balance is not sufficient.");
        }
        let msg = TransferContract {
            owner_address: owner.prefixed_bytes().to_vec(),
            to_address: to.prefixed_bytes().to_vec(),
            amount,
        };
        Ok(self.build(ContractType::TransferContract, &msg))
    }

    fn freeze_balance_v2(&mut self, body: &Value) -> Result<Value> {
        let owner = field_addr(body, "owner_address")?;
        let amount = field_i64(body, "frozen_balance")?;
        let resource = field_resource(body)?;
        let a = self.existing(owner)?;
        if positive("frozenBalance", amount)? < tron::SUN_PER_TRX {
            anyhow::bail!("frozenBalance must be greater than or equal to 1 TRX");
        }
        if a.balance_sun < amount as u64 {
            anyhow::bail!("frozenBalance must be less than or equal to accountBalance");
        }
        let msg = FreezeBalanceV2Contract {
            owner_address: owner.prefixed_bytes().to_vec(),
            frozen_balance: amount,
            resource: resource as i32,
        };
        Ok(self.build(ContractType::FreezeBalanceV2Contract, &msg))
    }

    fn unfreeze_balance_v2(&mut self, body: &Value) -> Result<Value> {
        let owner = field_addr(body, "owner_address")?;
        let amount = field_i64(body, "unfreeze_balance")?;
        let resource = field_resource(body)?;
        let mut a = self.existing(owner)?;
        if *frozen_mut(&mut a, resource) == 0 {
            anyhow::bail!("no frozenBalance({})", resource.as_api_str());
        }
        let msg = UnfreezeBalanceV2Contract {
            owner_address: owner.prefixed_bytes().to_vec(),
            unfreeze_balance: amount,
            resource: resource as i32,
        };
        Ok(self.build(ContractType::UnfreezeBalanceV2Contract, &msg))
    }

    fn withdraw_expire_unfreeze(&mut self, body: &Value) -> Result<Value> {
        let owner = field_addr(body, "owner_address")?;
        self.existing(owner)?;
        let msg = WithdrawExpireUnfreezeContract {
            owner_address: owner.prefixed_bytes().to_vec(),
        };
        Ok(self.build(ContractType::WithdrawExpireUnfreezeContract, &msg))
    }

    fn delegate_resource(&mut self, body: &Value) -> Result<Value> {
        let owner = field_addr(body, "owner_address")?;
        let receiver = field_addr(body, "receiver_address")?;
        let amount = field_i64(body, "balance")?;
        let resource = field_resource(body)?;
        let a = self.existing(owner)?;
        if a.frozen_energy_sun == 0 {
            anyhow::bail!("no frozenBalance(ENERGY)");
        }
        let msg = DelegateResourceContract {
            owner_address: owner.prefixed_bytes().to_vec(),
            resource: resource as i32,
            balance: amount,
            receiver_address: receiver.prefixed_bytes().to_vec(),
            lock: body.get("lock").and_then(Value::as_bool).unwrap_or(false),
            lock_period: body.get("lock_period").and_then(Value::as_i64).unwrap_or(0),
        };
        Ok(self.build(ContractType::DelegateResourceContract, &msg))
    }

    fn undelegate_resource(&mut self, body: &Value) -> Result<Value> {
        let owner = field_addr(body, "owner_address")?;
        let receiver = field_addr(body, "receiver_address")?;
        let amount = field_i64(body, "balance")?;
        let resource = field_resource(body)?;
        self.existing(owner)?;
        let msg = UnDelegateResourceContract {
            owner_address: owner.prefixed_bytes().to_vec(),
            resource: resource as i32,
            balance: amount,
            receiver_address: receiver.prefixed_bytes().to_vec(),
        };
        Ok(self.build(ContractType::UnDelegateResourceContract, &msg))
    }

    fn trigger_smart_contract(&mut self, body: &Value) -> Result<Value> {
        let (owner, contract, sig, param) = trigger_param(body)?;
        self.existing(owner)?;
        self.trc20_call(contract, &sig, &param)?;
        let mut data = selector(&sig).to_vec();
        data.extend_from_slice(&param);
        let msg = TriggerSmartContract {
            owner_address: owner.prefixed_bytes().to_vec(),
            contract_address: contract.prefixed_bytes().to_vec(),
            call_value: body.get("call_value").and_then(Value::as_i64).unwrap_or(0),
            data,
            ..Default::default()
        };
        Ok(self.build(ContractType::TriggerSmartContract, &msg))
    }

    /// Returns the first result word and the energy the call would use.
    fn trigger_constant_contract(&self, body: &Value) -> Result<(String, i64)> {
        let (owner, contract, sig, param) = trigger_param(body)?;
        self.trc20_call(contract, &sig, &param)?;
        if sig == TRC20_BALANCE_OF {
            let who = Address::from_slice(param.get(12..32).context("short parameter")?);
            let bal = self
                .token_balances
                .get(&TronAddress::from_evm(who))
                .copied()
                .unwrap_or_default();
            return Ok((hex::encode(bal.to_be_bytes::<32>()), 0));
        }
        let have = self.token_balances.get(&owner).copied().unwrap_or_default();
        let amount = U256::from_be_slice(param.get(32..64).context("short parameter")?);
        let ok = if have >= amount { U256::from(1u8) } else { U256::ZERO };
        Ok((hex::encode(ok.to_be_bytes::<32>()), TOKEN_TRANSFER_ENERGY))
    }

    fn broadcast_hex(&mut self, body: &Value) -> Result<Broadcast> {
        let tx_hex = body
            .get("transaction")
            .and_then(Value::as_str)
            .context("missing transaction")?;
        let bytes = hex::decode(tx_hex).context("transaction is not hex")?;
        let tx = Transaction::decode(bytes.as_slice()).context("decode transaction")?;
        let b = self.apply(&tx)?;
        self.broadcasts.push(b.clone());
        Ok(b)
    }
}

fn trigger_param(body: &Value) -> Result<(TronAddress, TronAddress, String, Vec<u8>)> {
    let owner = field_addr(body, "owner_address")?;
    let contract = field_addr(body, "contract_address")?;
    let sig = body
        .get("function_selector")
        .and_then(Value::as_str)
        .context("missing function_selector")?
        .to_string();
    let param = hex::decode(body.get("parameter").and_then(Value::as_str).unwrap_or(""))
        .context("parameter is not hex")?;
    Ok((owner, contract, sig, param))
}

fn rejected(code: &str, err: &anyhow::Error) -> Value {
    json!({ "code": code, "message": hex::encode(format!("{err:#}")) })
}

async fn get_account(
    State(s): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let key = headers
        .get(tron::http::API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let mut st = lock(&s);
    st.api_keys.push(key);
    reply(st.account_json(&body))
}

async fn get_account_resource(State(s): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    reply(lock(&s).account_resource_json(&body))
}

async fn get_chain_parameters() -> Json<Value> {
    Json(json!({
        "chainParameter": [
            { "key": "getMaintenanceTimeInterval", "value": 21_600_000 },
            { "key": "getTransactionFee", "value": TX_FEE_SUN_PER_BYTE },
            { "key": "getEnergyFee", "value": ENERGY_FEE_SUN },
            { "key": "getAllowMultiSign", "value": 1 }
        ]
    }))
}

async fn get_now_block(State(s): State<Shared>) -> Json<Value> {
    let block = lock(&s).block;
    Json(json!({
        "blockID": format!("{block:064x}"),
        "block_header": { "raw_data": { "number": block, "timestamp": 1_700_000_000_000i64 } }
    }))
}

async fn get_can_delegated_max_size(
    State(s): State<Shared>,
    Json(body): Json<Value>,
) -> Json<Value> {
    reply(lock(&s).can_delegate_max_json(&body))
}

async fn get_delegated_resource_v2(
    State(s): State<Shared>,
    Json(body): Json<Value>,
) -> Json<Value> {
    reply(lock(&s).delegated_resource_json(&body))
}

async fn create_transaction(State(s): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    reply(lock(&s).create_transaction(&body))
}

async fn freeze_balance_v2(State(s): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    reply(lock(&s).freeze_balance_v2(&body))
}

async fn unfreeze_balance_v2(State(s): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    reply(lock(&s).unfreeze_balance_v2(&body))
}

async fn withdraw_expire_unfreeze(State(s): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    reply(lock(&s).withdraw_expire_unfreeze(&body))
}

async fn delegate_resource(State(s): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    reply(lock(&s).delegate_resource(&body))
}

async fn undelegate_resource(State(s): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    reply(lock(&s).undelegate_resource(&body))
}

async fn trigger_smart_contract(State(s): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let r = lock(&s).trigger_smart_contract(&body);
    Json(match r {
        Ok(tx) => json!({ "result": { "result": true }, "transaction": tx }),
        Err(e) => json!({ "result": rejected("CONTRACT_VALIDATE_ERROR", &e) }),
    })
}

async fn trigger_constant_contract(
    State(s): State<Shared>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let r = lock(&s).trigger_constant_contract(&body);
    Json(match r {
        Ok((word, energy)) => json!({
            "result": { "result": true },
            "energy_used": energy,
            "constant_result": [word]
        }),
        Err(e) => json!({ "result": rejected("CONTRACT_EXE_ERROR", &e) }),
    })
}

async fn broadcast_hex(State(s): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let r = lock(&s).broadcast_hex(&body);
    Json(match r {
        Ok(b) => json!({ "result": true, "txid": b.txid }),
        Err(e) => {
            let mut v = rejected("CONTRACT_VALIDATE_ERROR", &e);
            v["result"] = json!(false);
            v
        }
    })
}
