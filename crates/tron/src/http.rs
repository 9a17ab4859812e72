use super::TronAddress;
use super::protocol::ResourceCode;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

pub const API_KEY_HEADER: &str = "TRON-PRO-API-KEY";

/// Thin client over the java-tron full-node HTTP API (`/wallet/*`, `visible=true`).
#[derive(Clone)]
pub struct TronHttp {
    base_url: String,
    client: reqwest::Client,
}

/// Unsigned transaction skeleton built by the node.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeTransaction {
    #[serde(rename = "txID")]
    pub txid: String,
    pub raw_data_hex: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrozenV2 {
    /// Absent for BANDWIDTH.
    #[serde(rename = "type", default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub amount: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountResourceInfo {
    #[serde(rename = "delegated_frozenV2_balance_for_energy", default)]
    pub delegated_frozen_v2_balance_for_energy: i64,
}

/// `/wallet/getaccount`. The node answers `{}` for addresses that were never activated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub balance: i64,
    #[serde(rename = "frozenV2", default)]
    pub frozen_v2: Vec<FrozenV2>,
    #[serde(default)]
    pub account_resource: Option<AccountResourceInfo>,
    #[serde(rename = "delegated_frozenV2_balance_for_bandwidth", default)]
    pub delegated_frozen_v2_balance_for_bandwidth: i64,
}

impl AccountInfo {
    pub fn exists(&self) -> bool {
        self.address.is_some()
    }

    /// Self-staked (not delegated away) balance for a resource, in sun.
    pub fn frozen_sun(&self, resource: ResourceCode) -> u64 {
        self.frozen_v2
            .iter()
            .filter(|f| frozen_entry_resource(f.resource.as_deref()) == Some(resource))
            .map(|f| u64::try_from(f.amount).unwrap_or(0))
            .sum()
    }

    /// Balance staked for `resource` and currently delegated to other accounts, in sun.
    pub fn delegated_sun(&self, resource: ResourceCode) -> u64 {
        let v = match resource {
            ResourceCode::Energy => self
                .account_resource
                .as_ref()
                .map(|r| r.delegated_frozen_v2_balance_for_energy)
                .unwrap_or(0),
            ResourceCode::Bandwidth => self.delegated_frozen_v2_balance_for_bandwidth,
            ResourceCode::TronPower => 0,
        };
        u64::try_from(v).unwrap_or(0)
    }

    pub fn balance_sun(&self) -> u64 {
        u64::try_from(self.balance).unwrap_or(0)
    }
}

fn frozen_entry_resource(s: Option<&str>) -> Option<ResourceCode> {
    match s {
        None => Some(ResourceCode::Bandwidth),
        Some(v) => ResourceCode::parse(v).ok(),
    }
}

/// `/wallet/getaccountresource`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountResourceMessage {
    #[serde(rename = "EnergyUsed", default)]
    pub energy_used: i64,
    #[serde(rename = "EnergyLimit", default)]
    pub energy_limit: i64,
    #[serde(rename = "NetUsed", default)]
    pub net_used: i64,
    #[serde(rename = "NetLimit", default)]
    pub net_limit: i64,
    #[serde(rename = "freeNetUsed", default)]
    pub free_net_used: i64,
    #[serde(rename = "freeNetLimit", default)]
    pub free_net_limit: i64,
    #[serde(rename = "TotalEnergyLimit", default)]
    pub total_energy_limit: i64,
    #[serde(rename = "TotalEnergyWeight", default)]
    pub total_energy_weight: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainParameter {
    pub key: String,
    #[serde(default)]
    pub value: i64,
}

/// `/wallet/getchainparameters`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainParameters {
    #[serde(rename = "chainParameter", default)]
    pub chain_parameter: Vec<ChainParameter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BroadcastResult {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    /// Hex-encoded UTF-8.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "blockNumber", default)]
    pub block_number: i64,
    #[serde(default)]
    pub fee: i64,
    /// `"FAILED"` when execution failed.
    #[serde(default)]
    pub result: Option<String>,
    #[serde(rename = "resMessage", default)]
    pub res_message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReturnInfo {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerResponse {
    #[serde(default)]
    pub result: ReturnInfo,
    #[serde(default)]
    pub transaction: Option<NodeTransaction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConstantResponse {
    #[serde(default)]
    pub result: ReturnInfo,
    #[serde(default)]
    pub constant_result: Vec<String>,
    #[serde(default)]
    pub energy_used: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MaxSize {
    #[serde(default)]
    max_size: i64,
}

/// One `from -> to` entry of `/wallet/getdelegatedresourcev2`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DelegatedResource {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub frozen_balance_for_bandwidth: i64,
    #[serde(default)]
    pub frozen_balance_for_energy: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DelegatedResourceList {
    #[serde(rename = "delegatedResource", default)]
    pub delegated_resource: Vec<DelegatedResource>,
}

impl DelegatedResourceList {
    /// Stake (sun) delegated for `resource` across all entries.
    pub fn total_sun(&self, resource: ResourceCode) -> u64 {
        self.delegated_resource
            .iter()
            .map(|d| match resource {
                ResourceCode::Energy => d.frozen_balance_for_energy,
                ResourceCode::Bandwidth => d.frozen_balance_for_bandwidth,
                ResourceCode::TronPower => 0,
            })
            .map(|v| u64::try_from(v).unwrap_or(0))
            .sum()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockHeaderRaw {
    #[serde(default)]
    pub number: i64,
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockHeader {
    #[serde(default)]
    pub raw_data: BlockHeaderRaw,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Block {
    #[serde(rename = "blockID", default)]
    pub block_id: String,
    #[serde(default)]
    pub block_header: BlockHeader,
}

/// Node messages are frequently hex-encoded UTF-8. Falls back to the input.
pub fn decode_node_message(s: &str) -> String {
    match hex::decode(s.trim()) {
        Ok(bytes) if !bytes.is_empty() => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => s.to_string(),
        },
        _ => s.to_string(),
    }
}

impl TronHttp {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
            headers.insert(
                API_KEY_HEADER,
                HeaderValue::from_str(key).context("invalid TRON api key header value")?,
            );
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("build tron http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_value(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("tron http {path}"))?;
        let status = resp.status();
        let text = resp.text().await.context("read tron http body")?;
        if !status.is_success() {
            anyhow::bail!("tron http {path}: status {status} body={text}");
        }
        let v: Value = serde_json::from_str(&text)
            .with_context(|| format!("tron http {path}: invalid json: {text}"))?;
        if let Some(err) = v.get("Error").and_then(Value::as_str) {
            anyhow::bail!("{path}: {err}");
        }
        tracing::debug!(path, "tron http ok");
        Ok(v)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        let v = self.post_value(path, &body).await?;
        serde_json::from_value(v).with_context(|| format!("decode {path} response"))
    }

    /// For the builder endpoints that return a bare transaction or an error.
    async fn post_tx(&self, path: &str, body: Value) -> Result<NodeTransaction> {
        let v = self.post_value(path, &body).await?;
        if let Some(msg) = v
            .get("result")
            .filter(|r| r.get("result").and_then(Value::as_bool) == Some(false))
            .and_then(|r| r.get("message"))
            .and_then(Value::as_str)
        {
            anyhow::bail!("{path}: {}", decode_node_message(msg));
        }
        serde_json::from_value(v)
            .with_context(|| format!("node returned no transaction for {path}"))
    }

    pub async fn get_account(&self, addr: TronAddress) -> Result<AccountInfo> {
        self.post(
            "/wallet/getaccount",
            json!({ "address": addr.to_base58check(), "visible": true }),
        )
        .await
    }

    pub async fn get_account_resource(&self, addr: TronAddress) -> Result<AccountResourceMessage> {
        self.post(
            "/wallet/getaccountresource",
            json!({ "address": addr.to_base58check(), "visible": true }),
        )
        .await
    }

    /// Stake `from` currently delegates to `to`. The node answers `{}` when there is none.
    pub async fn get_delegated_resource_v2(
        &self,
        from: TronAddress,
        to: TronAddress,
    ) -> Result<DelegatedResourceList> {
        self.post(
            "/wallet/getdelegatedresourcev2",
            json!({
                "fromAddress": from.to_base58check(),
                "toAddress": to.to_base58check(),
                "visible": true,
            }),
        )
        .await
    }

    pub async fn get_chain_parameters(&self) -> Result<ChainParameters> {
        self.post("/wallet/getchainparameters", json!({})).await
    }

    pub async fn get_now_block(&self) -> Result<Block> {
        self.post("/wallet/getnowblock", json!({})).await
    }

    pub async fn create_transaction(
        &self,
        owner: TronAddress,
        to: TronAddress,
        amount_sun: i64,
    ) -> Result<NodeTransaction> {
        self.post_tx(
            "/wallet/createtransaction",
            json!({
                "owner_address": owner.to_base58check(),
                "to_address": to.to_base58check(),
                "amount": amount_sun,
                "visible": true,
            }),
        )
        .await
    }

    pub async fn freeze_balance_v2(
        &self,
        owner: TronAddress,
        frozen_balance_sun: i64,
        resource: ResourceCode,
    ) -> Result<NodeTransaction> {
        self.post_tx(
            "/wallet/freezebalancev2",
            json!({
                "owner_address": owner.to_base58check(),
                "frozen_balance": frozen_balance_sun,
                "resource": resource.as_api_str(),
                "visible": true,
            }),
        )
        .await
    }

    pub async fn unfreeze_balance_v2(
        &self,
        owner: TronAddress,
        unfreeze_balance_sun: i64,
        resource: ResourceCode,
    ) -> Result<NodeTransaction> {
        self.post_tx(
            "/wallet/unfreezebalancev2",
            json!({
                "owner_address": owner.to_base58check(),
                "unfreeze_balance": unfreeze_balance_sun,
                "resource": resource.as_api_str(),
                "visible": true,
            }),
        )
        .await
    }

    pub async fn withdraw_expire_unfreeze(&self, owner: TronAddress) -> Result<NodeTransaction> {
        self.post_tx(
            "/wallet/withdrawexpireunfreeze",
            json!({ "owner_address": owner.to_base58check(), "visible": true }),
        )
        .await
    }

    pub async fn delegate_resource(
        &self,
        owner: TronAddress,
        receiver: TronAddress,
        resource: ResourceCode,
        balance_sun: i64,
        lock: bool,
        lock_period: i64,
    ) -> Result<NodeTransaction> {
        let mut body = json!({
            "owner_address": owner.to_base58check(),
            "receiver_address": receiver.to_base58check(),
            "balance": balance_sun,
            "resource": resource.as_api_str(),
            "lock": lock,
            "visible": true,
        });
        if lock {
            body["lock_period"] = json!(lock_period);
        }
        self.post_tx("/wallet/delegateresource", body).await
    }

    pub async fn undelegate_resource(
        &self,
        owner: TronAddress,
        receiver: TronAddress,
        resource: ResourceCode,
        balance_sun: i64,
    ) -> Result<NodeTransaction> {
        self.post_tx(
            "/wallet/undelegateresource",
            json!({
                "owner_address": owner.to_base58check(),
                "receiver_address": receiver.to_base58check(),
                "balance": balance_sun,
                "resource": resource.as_api_str(),
                "visible": true,
            }),
        )
        .await
    }

    /// Max balance (sun) `owner` can currently delegate for `resource`.
    pub async fn get_can_delegated_max_size(
        &self,
        owner: TronAddress,
        resource: ResourceCode,
    ) -> Result<u64> {
        let v: MaxSize = self
            .post(
                "/wallet/getcandelegatedmaxsize",
                json!({
                    "owner_address": owner.to_base58check(),
                    "type": resource as i32,
                    "visible": true,
                }),
            )
            .await?;
        Ok(u64::try_from(v.max_size).unwrap_or(0))
    }

    /// `function_selector` is the canonical signature, e.g. `transfer(address,uint256)`;
    /// `parameter` is the ABI-encoded arguments without the 4-byte selector.
    pub async fn trigger_smart_contract(
        &self,
        owner: TronAddress,
        contract: TronAddress,
        function_selector: &str,
        parameter: &[u8],
        call_value_sun: i64,
        fee_limit_sun: i64,
    ) -> Result<NodeTransaction> {
        let resp: TriggerResponse = self
            .post(
                "/wallet/triggersmartcontract",
                json!({
                    "owner_address": owner.to_base58check(),
                    "contract_address": contract.to_base58check(),
                    "function_selector": function_selector,
                    "parameter": hex::encode(parameter),
                    "call_value": call_value_sun,
                    "fee_limit": fee_limit_sun,
                    "visible": true,
                }),
            )
            .await?;
        if !resp.result.result {
            let msg = resp
                .result
                .message
                .as_deref()
                .map(decode_node_message)
                .unwrap_or_else(|| "<missing>".to_string());
            anyhow::bail!("triggersmartcontract rejected: {msg}");
        }
        resp.transaction
            .context("node returned no transaction for TriggerSmartContract")
    }

    pub async fn trigger_constant_contract(
        &self,
        owner: TronAddress,
        contract: TronAddress,
        function_selector: &str,
        parameter: &[u8],
    ) -> Result<ConstantResponse> {
        let resp: ConstantResponse = self
            .post(
                "/wallet/triggerconstantcontract",
                json!({
                    "owner_address": owner.to_base58check(),
                    "contract_address": contract.to_base58check(),
                    "function_selector": function_selector,
                    "parameter": hex::encode(parameter),
                    "visible": true,
                }),
            )
            .await?;
        if !resp.result.result {
            let msg = resp
                .result
                .message
                .as_deref()
                .map(decode_node_message)
                .unwrap_or_else(|| "<missing>".to_string());
            anyhow::bail!("triggerconstantcontract rejected: {msg}");
        }
        Ok(resp)
    }

    /// Broadcasts a protobuf-encoded signed `Transaction`.
    pub async fn broadcast_hex(&self, tx_bytes: &[u8]) -> Result<BroadcastResult> {
        let res: BroadcastResult = self
            .post(
                "/wallet/broadcasthex",
                json!({ "transaction": hex::encode(tx_bytes) }),
            )
            .await?;
        if !res.result {
            let code = res.code.clone().unwrap_or_else(|| "<none>".to_string());
            let msg = res
                .message
                .as_deref()
                .map(decode_node_message)
                .unwrap_or_else(|| "<missing>".to_string());
            anyhow::bail!("broadcast rejected: code={code} msg={msg}");
        }
        Ok(res)
    }

    pub async fn get_transaction_info_by_id(&self, txid: [u8; 32]) -> Result<TransactionInfo> {
        self.post(
            "/wallet/gettransactioninfobyid",
            json!({ "value": hex::encode(txid) }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_node_message_handles_hex_and_plain() {
        assert_eq!(
            decode_node_message(&hex::encode("account does not exist")),
            "account does not exist"
        );
        assert_eq!(decode_node_message("plain text"), "plain text");
        assert_eq!(decode_node_message(""), "");
    }

    #[test]
    fn delegated_resource_totals_split_by_resource() {
        let list: DelegatedResourceList = serde_json::from_value(json!({
            "delegatedResource": [
                {
                    "from": "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t",
                    "to": "TNPeeaaFB7K9cmo4uQpcU32zGK8G1NYqeL",
                    "frozen_balance_for_energy": 60_000_000
                },
                {
                    "from": "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t",
                    "to": "TNPeeaaFB7K9cmo4uQpcU32zGK8G1NYqeL",
                    "frozen_balance_for_bandwidth": 1_000_000,
                    "expire_time_for_energy": 0
                }
            ]
        }))
        .unwrap();
        assert_eq!(list.total_sun(ResourceCode::Energy), 60_000_000);
        assert_eq!(list.total_sun(ResourceCode::Bandwidth), 1_000_000);

        let none: DelegatedResourceList = serde_json::from_str("{}").unwrap();
        assert_eq!(none.total_sun(ResourceCode::Energy), 0);
    }

    #[test]
    fn empty_account_is_not_activated() {
        let acct: AccountInfo = serde_json::from_str("{}").unwrap();
        assert!(!acct.exists());
        assert_eq!(acct.balance_sun(), 0);
        assert_eq!(acct.frozen_sun(ResourceCode::Energy), 0);
    }

    #[test]
    fn account_frozen_and_delegated_balances_split_by_resource() {
        let acct: AccountInfo = serde_json::from_value(json!({
            "address": "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t",
            "balance": 5_000_000,
            "frozenV2": [
                { "amount": 2_000_000 },
                { "type": "ENERGY", "amount": 30_000_000 },
                { "type": "TRON_POWER" }
            ],
            "account_resource": { "delegated_frozenV2_balance_for_energy": 10_000_000 }
        }))
        .unwrap();
        assert!(acct.exists());
        assert_eq!(acct.balance_sun(), 5_000_000);
        assert_eq!(acct.frozen_sun(ResourceCode::Bandwidth), 2_000_000);
        assert_eq!(acct.frozen_sun(ResourceCode::Energy), 30_000_000);
        assert_eq!(acct.delegated_sun(ResourceCode::Energy), 10_000_000);
        assert_eq!(acct.delegated_sun(ResourceCode::Bandwidth), 0);
    }
}
