//! Hand-maintained subset of `Tron.proto` / `core/contract/*.proto`.
//!
//! Only the messages needed to decode node-built transactions, patch them and re-encode them for
//! signing. Field tags match java-tron so encoding stays byte-identical to what the node produced.

use anyhow::{Context, Result};
use prost::Message;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ResourceCode {
    Bandwidth = 0,
    Energy = 1,
    TronPower = 2,
}

impl ResourceCode {
    /// Name used by the HTTP API (`"ENERGY"`, ...).
    pub fn as_api_str(self) -> &'static str {
        match self {
            Self::Bandwidth => "BANDWIDTH",
            Self::Energy => "ENERGY",
            Self::TronPower => "TRON_POWER",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BANDWIDTH" | "NET" => Ok(Self::Bandwidth),
            "ENERGY" => Ok(Self::Energy),
            "TRON_POWER" => Ok(Self::TronPower),
            other => anyhow::bail!("unknown resource: {other}"),
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AccountId {
    #[prost(bytes = "vec", tag = "1")]
    pub name: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub address: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Authority {
    #[prost(message, optional, tag = "1")]
    pub account: Option<AccountId>,
    #[prost(bytes = "vec", tag = "2")]
    pub permission_name: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Transaction {
    #[prost(message, optional, tag = "1")]
    pub raw_data: Option<transaction::Raw>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub signature: Vec<Vec<u8>>,
    #[prost(message, repeated, tag = "5")]
    pub ret: Vec<transaction::Result>,
}

pub mod transaction {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Contract {
        #[prost(enumeration = "contract::ContractType", tag = "1")]
        pub r#type: i32,
        #[prost(message, optional, tag = "2")]
        pub parameter: Option<::prost_types::Any>,
        #[prost(bytes = "vec", tag = "3")]
        pub provider: Vec<u8>,
        #[prost(bytes = "vec", tag = "4")]
        pub contract_name: Vec<u8>,
        #[prost(int32, tag = "5")]
        pub permission_id: i32,
    }

    pub mod contract {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum ContractType {
            AccountCreateContract = 0,
            TransferContract = 1,
            TransferAssetContract = 2,
            TriggerSmartContract = 31,
            FreezeBalanceV2Contract = 54,
            UnfreezeBalanceV2Contract = 55,
            WithdrawExpireUnfreezeContract = 56,
            DelegateResourceContract = 57,
            UnDelegateResourceContract = 58,
            CancelAllUnfreezeV2Contract = 59,
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Result {
        #[prost(int64, tag = "1")]
        pub fee: i64,
        #[prost(int32, tag = "2")]
        pub ret: i32,
        #[prost(int32, tag = "3")]
        pub contract_ret: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Raw {
        #[prost(bytes = "vec", tag = "1")]
        pub ref_block_bytes: Vec<u8>,
        #[prost(int64, tag = "3")]
        pub ref_block_num: i64,
        #[prost(bytes = "vec", tag = "4")]
        pub ref_block_hash: Vec<u8>,
        #[prost(int64, tag = "8")]
        pub expiration: i64,
        #[prost(message, repeated, tag = "9")]
        pub auths: Vec<super::Authority>,
        /// Memo.
        #[prost(bytes = "vec", tag = "10")]
        pub data: Vec<u8>,
        #[prost(message, repeated, tag = "11")]
        pub contract: Vec<Contract>,
        #[prost(bytes = "vec", tag = "12")]
        pub scripts: Vec<u8>,
        #[prost(int64, tag = "14")]
        pub timestamp: i64,
        #[prost(int64, tag = "18")]
        pub fee_limit: i64,
    }
}

pub use transaction::contract::ContractType;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransferContract {
    #[prost(bytes = "vec", tag = "1")]
    pub owner_address: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub to_address: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub amount: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TriggerSmartContract {
    #[prost(bytes = "vec", tag = "1")]
    pub owner_address: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub contract_address: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub call_value: i64,
    #[prost(bytes = "vec", tag = "4")]
    pub data: Vec<u8>,
    #[prost(int64, tag = "5")]
    pub call_token_value: i64,
    #[prost(int64, tag = "6")]
    pub token_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FreezeBalanceV2Contract {
    #[prost(bytes = "vec", tag = "1")]
    pub owner_address: Vec<u8>,
    #[prost(int64, tag = "2")]
    pub frozen_balance: i64,
    #[prost(enumeration = "ResourceCode", tag = "3")]
    pub resource: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnfreezeBalanceV2Contract {
    #[prost(bytes = "vec", tag = "1")]
    pub owner_address: Vec<u8>,
    #[prost(int64, tag = "2")]
    pub unfreeze_balance: i64,
    #[prost(enumeration = "ResourceCode", tag = "3")]
    pub resource: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WithdrawExpireUnfreezeContract {
    #[prost(bytes = "vec", tag = "1")]
    pub owner_address: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DelegateResourceContract {
    #[prost(bytes = "vec", tag = "1")]
    pub owner_address: Vec<u8>,
    #[prost(enumeration = "ResourceCode", tag = "2")]
    pub resource: i32,
    #[prost(int64, tag = "3")]
    pub balance: i64,
    #[prost(bytes = "vec", tag = "4")]
    pub receiver_address: Vec<u8>,
    #[prost(bool, tag = "5")]
    pub lock: bool,
    #[prost(int64, tag = "6")]
    pub lock_period: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnDelegateResourceContract {
    #[prost(bytes = "vec", tag = "1")]
    pub owner_address: Vec<u8>,
    #[prost(enumeration = "ResourceCode", tag = "2")]
    pub resource: i32,
    #[prost(int64, tag = "3")]
    pub balance: i64,
    #[prost(bytes = "vec", tag = "4")]
    pub receiver_address: Vec<u8>,
}

const TYPE_URL_PREFIX: &str = "type.googleapis.com/protocol.";

impl ContractType {
    /// Protobuf message name carried in `Any.type_url`.
    pub fn message_name(self) -> &'static str {
        match self {
            Self::AccountCreateContract => "AccountCreateContract",
            Self::TransferContract => "TransferContract",
            Self::TransferAssetContract => "TransferAssetContract",
            Self::TriggerSmartContract => "TriggerSmartContract",
            Self::FreezeBalanceV2Contract => "FreezeBalanceV2Contract",
            Self::UnfreezeBalanceV2Contract => "UnfreezeBalanceV2Contract",
            Self::WithdrawExpireUnfreezeContract => "WithdrawExpireUnfreezeContract",
            Self::DelegateResourceContract => "DelegateResourceContract",
            Self::UnDelegateResourceContract => "UnDelegateResourceContract",
            Self::CancelAllUnfreezeV2Contract => "CancelAllUnfreezeV2Contract",
        }
    }

    pub fn type_url(self) -> String {
        format!("{TYPE_URL_PREFIX}{}", self.message_name())
    }
}

/// Wraps a contract payload into the single-contract `raw.contract` entry.
pub fn contract_entry<M: Message>(ty: ContractType, msg: &M) -> transaction::Contract {
    transaction::Contract {
        r#type: ty as i32,
        parameter: Some(::prost_types::Any {
            type_url: ty.type_url(),
            value: msg.encode_to_vec(),
        }),
        ..Default::default()
    }
}

/// Returns the owner address bytes of the (single) contract in `raw`, after checking its type.
pub fn contract_owner(raw: &transaction::Raw, expected: ContractType) -> Result<Vec<u8>> {
    if raw.contract.len() != 1 {
        anyhow::bail!("expected exactly 1 contract in tx, got {}", raw.contract.len());
    }
    let c = &raw.contract[0];
    let ty = ContractType::try_from(c.r#type)
        .map_err(|_| anyhow::anyhow!("unknown contract type {}", c.r#type))?;
    if ty != expected {
        anyhow::bail!("node built {ty:?}, expected {expected:?}");
    }
    let any = c.parameter.as_ref().context("contract has no parameter")?;
    let v = any.value.as_slice();
    let owner = match ty {
        ContractType::TransferContract => TransferContract::decode(v)?.owner_address,
        ContractType::TriggerSmartContract => TriggerSmartContract::decode(v)?.owner_address,
        ContractType::FreezeBalanceV2Contract => FreezeBalanceV2Contract::decode(v)?.owner_address,
        ContractType::UnfreezeBalanceV2Contract => {
            UnfreezeBalanceV2Contract::decode(v)?.owner_address
        }
        ContractType::WithdrawExpireUnfreezeContract => {
            WithdrawExpireUnfreezeContract::decode(v)?.owner_address
        }
        ContractType::DelegateResourceContract => {
            DelegateResourceContract::decode(v)?.owner_address
        }
        ContractType::UnDelegateResourceContract => {
            UnDelegateResourceContract::decode(v)?.owner_address
        }
        other => anyhow::bail!("unsupported contract type {other:?}"),
    };
    Ok(owner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raw() -> transaction::Raw {
        let transfer = TransferContract {
            owner_address: vec![0x41; 21],
            to_address: vec![0x42; 21],
            amount: 1_500_000,
        };
        transaction::Raw {
            ref_block_bytes: vec![0x12, 0x34],
            ref_block_hash: vec![0xab; 8],
            expiration: 1_700_000_060_000,
            contract: vec![contract_entry(ContractType::TransferContract, &transfer)],
            timestamp: 1_700_000_000_000,
            ..Default::default()
        }
    }

    #[test]
    fn raw_reencodes_byte_identically() {
        let bytes = sample_raw().encode_to_vec();
        let decoded = transaction::Raw::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded.encode_to_vec(), bytes);
    }

    #[test]
    fn contract_owner_checks_type_and_extracts_owner() {
        let raw = sample_raw();
        let owner = contract_owner(&raw, ContractType::TransferContract).unwrap();
        assert_eq!(owner, vec![0x41; 21]);
        assert!(contract_owner(&raw, ContractType::FreezeBalanceV2Contract).is_err());
    }

    #[test]
    fn resource_code_parse_accepts_api_names() {
        assert_eq!(ResourceCode::parse("energy").unwrap(), ResourceCode::Energy);
        assert_eq!(ResourceCode::parse("BANDWIDTH").unwrap(), ResourceCode::Bandwidth);
        assert_eq!(ResourceCode::Energy.as_api_str(), "ENERGY");
        assert!(ResourceCode::parse("water").is_err());
    }
}
