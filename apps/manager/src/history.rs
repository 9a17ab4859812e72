use crate::store::{timestamp, write_json_atomic};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Serialized as a snake_case name. Labels written by older tools are read back as the
/// matching kind, or kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TxKind {
    TrxTransfer,
    TokenTransfer,
    Freeze,
    Unfreeze,
    Delegate,
    Undelegate,
    Withdraw,
    Other(String),
}

impl TxKind {
    pub fn label(&self) -> &str {
        match self {
            Self::TrxTransfer => "TRX transfer",
            Self::TokenTransfer => "token transfer",
            Self::Freeze => "freeze",
            Self::Unfreeze => "unfreeze",
            Self::Delegate => "delegate",
            Self::Undelegate => "undelegate",
            Self::Withdraw => "withdraw",
            Self::Other(s) => s,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::TrxTransfer => "trx_transfer",
            Self::TokenTransfer => "token_transfer",
            Self::Freeze => "freeze",
            Self::Unfreeze => "unfreeze",
            Self::Delegate => "delegate",
            Self::Undelegate => "undelegate",
            Self::Withdraw => "withdraw",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for TxKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "trx_transfer" => Self::TrxTransfer,
            "token_transfer" | "USDT转账" => Self::TokenTransfer,
            "freeze" | "冻结TRX获取能量" => Self::Freeze,
            "unfreeze" | "解冻TRX" => Self::Unfreeze,
            "delegate" => Self::Delegate,
            "undelegate" => Self::Undelegate,
            "withdraw" => Self::Withdraw,
            _ => Self::Other(s),
        }
    }
}

impl From<TxKind> for String {
    fn from(k: TxKind) -> Self {
        k.name().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxRecord {
    pub txid: String,
    #[serde(default)]
    pub from_address: String,
    #[serde(default)]
    pub to_address: String,
    /// Human-readable amount with unit, e.g. `"10.000000 TRX"`. Bare numbers from older files
    /// are kept as their decimal text.
    #[serde(default, deserialize_with = "amount_text")]
    pub amount: String,
    #[serde(rename = "type")]
    pub kind: TxKind,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub status: String,
}

fn amount_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "amount must be a string or a number, got {other}"
        ))),
    }
}

impl TxRecord {
    pub fn sent(
        kind: TxKind,
        txid: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            txid: txid.into(),
            from_address: from.into(),
            to_address: to.into(),
            amount: amount.into(),
            kind,
            timestamp: Utc::now(),
            status: "sent".to_string(),
        }
    }
}

/// Append-only JSON array of broadcast transactions.
#[derive(Debug, Clone)]
pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> Result<Vec<TxRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let s = fs::read_to_string(&self.path)
            .with_context(|| format!("read history {}", self.path.display()))?;
        if s.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&s).with_context(|| format!("parse history {}", self.path.display()))
    }

    pub fn append(&self, record: TxRecord) -> Result<()> {
        let mut all = self.list()?;
        all.push(record);
        write_json_atomic(&self.path, &all)
    }
}
