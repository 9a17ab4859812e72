use super::TronAddress;
use anyhow::{Context, Result};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::rand_core::OsRng;
use sha2::{Digest, Sha256};

/// Anything that can sign a Tron transaction on behalf of one address.
///
/// Transaction builders only see this trait, so callers decide where key material lives.
pub trait TxSigner: Send + Sync {
    fn address(&self) -> TronAddress;

    /// Signs `sha256(raw_data)` and returns the 65-byte `r || s || v` signature.
    fn sign_raw_data(&self, raw_data: &[u8]) -> Result<Vec<u8>>;
}

#[derive(Clone)]
pub struct TronWallet {
    key: SigningKey,
    address: TronAddress,
}

impl std::fmt::Debug for TronWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TronWallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl TronWallet {
    pub fn new(private_key: [u8; 32]) -> Result<Self> {
        let key = SigningKey::from_slice(&private_key).context("invalid private key")?;
        let address = TronAddress::from_verifying_key(key.verifying_key());
        Ok(Self { key, address })
    }

    pub fn random() -> Self {
        let key = SigningKey::random(&mut OsRng);
        let address = TronAddress::from_verifying_key(key.verifying_key());
        Self { key, address }
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != 64 {
            anyhow::bail!("private key must be 64 hex chars (got {})", s.len());
        }
        let bytes = hex::decode(s).context("invalid private key hex")?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Self::new(out)
    }

    pub fn address(&self) -> TronAddress {
        self.address
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.key.to_bytes())
    }
}

impl TxSigner for TronWallet {
    fn address(&self) -> TronAddress {
        self.address
    }

    fn sign_raw_data(&self, raw_data: &[u8]) -> Result<Vec<u8>> {
        let (sig, recid) = self
            .key
            .sign_digest_recoverable(Sha256::new_with_prefix(raw_data))
            .context("sign Tron tx")?;

        let mut sig65 = sig.to_bytes().to_vec();
        sig65.push(recid.to_byte() + 27);
        Ok(sig65)
    }
}
