use alloy::dyn_abi::{DynSolValue, JsonAbiExt};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, U256, keccak256};
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

pub const TRC20_TRANSFER: &str = "transfer(address,uint256)";
pub const TRC20_BALANCE_OF: &str = "balanceOf(address)";

pub fn selector(sig: &str) -> [u8; 4] {
    let hash = keccak256(sig.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn encode_address(addr: Address) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[12..].copy_from_slice(addr.as_slice());
    out
}

pub fn encode_u256(v: U256) -> [u8; 32] {
    v.to_be_bytes()
}

/// Arguments of `transfer(address,uint256)` (no selector; the HTTP API takes it separately).
pub fn encode_trc20_transfer_args(to: Address, amount: U256) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 + 32);
    out.extend_from_slice(&encode_address(to));
    out.extend_from_slice(&encode_u256(amount));
    out
}

pub fn encode_trc20_balance_of_args(owner: Address) -> Vec<u8> {
    encode_address(owner).to_vec()
}

/// Reads the first return word of a constant call (`constant_result[0]`, hex).
pub fn decode_u256_word(hex_word: &str) -> Result<U256> {
    let bytes = hex::decode(hex_word.trim()).context("constant_result is not hex")?;
    if bytes.len() < 32 {
        anyhow::bail!("constant_result too short ({} bytes)", bytes.len());
    }
    Ok(U256::from_be_slice(&bytes[..32]))
}

/// `transfer` / `balanceOf` resolved from an externally supplied contract ABI.
#[derive(Debug, Clone)]
pub struct Trc20Abi {
    transfer: Function,
    balance_of: Function,
}

impl Trc20Abi {
    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read abi file {}", path.display()))?;
        Self::from_json(&s).with_context(|| format!("parse abi file {}", path.display()))
    }

    /// Accepts a plain ABI array, `{"entrys": [...]}` (node `getcontract` shape) or
    /// `{"abi": [...]}`. Tron-style capitalised `type`/`stateMutability` values are normalised.
    pub fn from_json(s: &str) -> Result<Self> {
        let v: Value = serde_json::from_str(s).context("abi is not json")?;
        let entries = match v {
            Value::Array(a) => a,
            Value::Object(mut o) => match o.remove("entrys").or_else(|| o.remove("abi")) {
                Some(Value::Array(a)) => a,
                _ => anyhow::bail!("abi object has no `entrys`/`abi` array"),
            },
            _ => anyhow::bail!("abi must be an array or object"),
        };
        let entries: Vec<Value> = entries
            .into_iter()
            .map(normalize_entry)
            .filter(|e| e.get("type").and_then(Value::as_str) == Some("function"))
            .collect();
        let abi: JsonAbi =
            serde_json::from_value(Value::Array(entries)).context("decode abi entries")?;

        let transfer = find_function(&abi, "transfer", TRC20_TRANSFER)?;
        let balance_of = find_function(&abi, "balanceOf", TRC20_BALANCE_OF)?;
        Ok(Self {
            transfer,
            balance_of,
        })
    }

    pub fn transfer_signature(&self) -> String {
        self.transfer.signature()
    }

    pub fn balance_of_signature(&self) -> String {
        self.balance_of.signature()
    }

    pub fn encode_transfer_args(&self, to: Address, amount: U256) -> Result<Vec<u8>> {
        let calldata = self
            .transfer
            .abi_encode_input(&[DynSolValue::Address(to), DynSolValue::Uint(amount, 256)])
            .context("encode transfer")?;
        Ok(calldata[4..].to_vec())
    }

    pub fn encode_balance_of_args(&self, owner: Address) -> Result<Vec<u8>> {
        let calldata = self
            .balance_of
            .abi_encode_input(&[DynSolValue::Address(owner)])
            .context("encode balanceOf")?;
        Ok(calldata[4..].to_vec())
    }
}

fn find_function(abi: &JsonAbi, name: &str, expected_sig: &str) -> Result<Function> {
    let funcs = abi
        .function(name)
        .with_context(|| format!("abi has no `{name}` function"))?;
    funcs
        .iter()
        .find(|f| f.signature() == expected_sig)
        .cloned()
        .with_context(|| format!("abi `{name}` does not match {expected_sig}"))
}

fn normalize_entry(mut e: Value) -> Value {
    if let Some(obj) = e.as_object_mut() {
        for key in ["type", "stateMutability"] {
            if let Some(Value::String(s)) = obj.get_mut(key) {
                *s = s.to_ascii_lowercase();
            }
        }
        // Tron omits `inputs`/`outputs` for parameterless entries.
        if obj.get("type").and_then(Value::as_str) == Some("function") {
            obj.entry("inputs").or_insert_with(|| Value::Array(Vec::new()));
            obj.entry("outputs").or_insert_with(|| Value::Array(Vec::new()));
            obj.entry("stateMutability")
                .or_insert_with(|| Value::String("nonpayable".to_string()));
            for key in ["inputs", "outputs"] {
                if let Some(Value::Array(params)) = obj.get_mut(key) {
                    for p in params.iter_mut().filter_map(Value::as_object_mut) {
                        p.entry("name").or_insert_with(|| Value::String(String::new()));
                    }
                }
            }
        }
    }
    e
}
