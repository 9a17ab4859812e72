use alloy::primitives::{Address, keccak256};
use anyhow::{Context, Result};
use k256::ecdsa::VerifyingKey;
use std::fmt;
use std::str::FromStr;

/// Mainnet address prefix byte.
pub const ADDRESS_PREFIX: u8 = 0x41;

/// 21-byte Tron address (`0x41 || evm20`). Displays as base58check (`T...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TronAddress([u8; 21]);

impl TronAddress {
    pub fn from_prefixed_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 21 {
            anyhow::bail!("tron address must be 21 bytes (got {})", bytes.len());
        }
        if bytes[0] != ADDRESS_PREFIX {
            anyhow::bail!("tron address must start with 0x41 (got 0x{:02x})", bytes[0]);
        }
        let mut out = [0u8; 21];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    pub fn from_evm(addr: Address) -> Self {
        let mut out = [0u8; 21];
        out[0] = ADDRESS_PREFIX;
        out[1..].copy_from_slice(addr.as_slice());
        Self(out)
    }

    /// Derives the address from a secp256k1 public key:
    /// `0x41 || keccak256(uncompressed_xy)[12..]`.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        let hash = keccak256(&point.as_bytes()[1..]);
        Self::from_evm(Address::from_slice(&hash[12..]))
    }

    pub fn prefixed_bytes(&self) -> [u8; 21] {
        self.0
    }

    pub fn evm(&self) -> Address {
        Address::from_slice(&self.0[1..])
    }

    pub fn to_base58check(&self) -> String {
        bs58::encode(self.0).with_check().into_string()
    }

    /// `41...` hex form used by the node in non-visible mode.
    pub fn to_hex41(&self) -> String {
        hex::encode(self.0)
    }

    /// Accepts base58check (`T...`), `41`-prefixed hex (with or without `0x`).
    pub fn parse_text(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            anyhow::bail!("empty tron address");
        }
        if s.starts_with('T') {
            let bytes = bs58::decode(s)
                .with_check(None)
                .into_vec()
                .with_context(|| format!("invalid base58check tron address: {s}"))?;
            return Self::from_prefixed_bytes(&bytes);
        }
        let h = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(h).with_context(|| format!("invalid hex tron address: {s}"))?;
        Self::from_prefixed_bytes(&bytes)
    }
}

impl fmt::Display for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58check())
    }
}

impl FromStr for TronAddress {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // USDT (TRC20) mainnet contract.
    const USDT_BASE58: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
    const USDT_HEX41: &str = "41a614f803b6fd780986a42c78ec9c7f77e6ded13c";

    #[test]
    fn base58_and_hex_forms_agree() {
        let a = TronAddress::parse_text(USDT_BASE58).unwrap();
        let b = TronAddress::parse_text(USDT_HEX41).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_base58check(), USDT_BASE58);
        assert_eq!(a.to_hex41(), USDT_HEX41);
        assert_eq!(a.prefixed_bytes()[0], ADDRESS_PREFIX);
    }

    #[test]
    fn evm_roundtrip_keeps_prefix() {
        let a = TronAddress::parse_text(USDT_BASE58).unwrap();
        assert_eq!(TronAddress::from_evm(a.evm()), a);
    }

    #[test]
    fn rejects_bad_checksum_and_wrong_prefix() {
        // Last character flipped.
        assert!(TronAddress::parse_text("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6u").is_err());
        assert!(
            TronAddress::parse_text("0x42a614f803b6fd780986a42c78ec9c7f77e6ded13c").is_err()
        );
        assert!(TronAddress::parse_text("").is_err());
        assert!(TronAddress::parse_text("41abcd").is_err());
    }
}
