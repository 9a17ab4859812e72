use crate::store::WalletRecord;
use anyhow::{Context, Result};
use std::collections::HashMap;
use tron::{TronAddress, TronWallet, TxSigner};

/// Hands out signers for stored wallets. Operations never read key material themselves.
pub trait SecretProvider: Send + Sync {
    fn signer_for(&self, name: &str, record: &WalletRecord) -> Result<Box<dyn TxSigner>>;
}

/// Plaintext keys kept in the wallet file (the legacy file format).
#[derive(Debug, Default, Clone, Copy)]
pub struct StoreSecrets;

impl SecretProvider for StoreSecrets {
    fn signer_for(&self, name: &str, record: &WalletRecord) -> Result<Box<dyn TxSigner>> {
        let wallet = TronWallet::from_hex(&record.private_key)
            .with_context(|| format!("wallet {name}: stored private key is invalid"))?;
        check_address(name, record, wallet.address())?;
        Ok(Box::new(wallet))
    }
}

/// Keys supplied out of band (`MANAGER_PRIVATE_KEYS_HEX_CSV`), matched to records by address.
#[derive(Debug, Default)]
pub struct EnvSecrets {
    by_address: HashMap<TronAddress, TronWallet>,
}

impl EnvSecrets {
    pub fn new(keys: &[[u8; 32]]) -> Result<Self> {
        let mut by_address = HashMap::with_capacity(keys.len());
        for (i, k) in keys.iter().enumerate() {
            let w = TronWallet::new(*k).with_context(|| format!("private key #{i} is invalid"))?;
            by_address.insert(w.address(), w);
        }
        Ok(Self { by_address })
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

impl SecretProvider for EnvSecrets {
    fn signer_for(&self, name: &str, record: &WalletRecord) -> Result<Box<dyn TxSigner>> {
        let addr = record.tron_address()?;
        let wallet = self
            .by_address
            .get(&addr)
            .with_context(|| format!("no private key configured for wallet {name} ({addr})"))?;
        Ok(Box::new(wallet.clone()))
    }
}

fn check_address(name: &str, record: &WalletRecord, derived: TronAddress) -> Result<()> {
    let stored = record.tron_address()?;
    if stored != derived {
        anyhow::bail!("wallet {name}: private key derives {derived}, record says {stored}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::WalletRole;
    use chrono::Utc;

    #[test]
    fn store_secrets_sign_for_matching_record() {
        let w = TronWallet::random();
        let rec = WalletRecord::new(&w, WalletRole::Main, Utc::now());
        let signer = StoreSecrets.signer_for("wallet_A", &rec).unwrap();
        assert_eq!(signer.address(), w.address());
    }

    #[test]
    fn store_secrets_reject_mismatched_key() {
        let w = TronWallet::random();
        let mut rec = WalletRecord::new(&w, WalletRole::Main, Utc::now());
        rec.private_key = TronWallet::random().private_key_hex();
        assert!(StoreSecrets.signer_for("wallet_A", &rec).is_err());
    }

    #[test]
    fn env_secrets_match_by_address() {
        let w = TronWallet::random();
        let other = TronWallet::random();
        let mut key = [0u8; 32];
        key.copy_from_slice(&hex::decode(w.private_key_hex()).unwrap());
        let secrets = EnvSecrets::new(&[key]).unwrap();
        assert_eq!(secrets.len(), 1);

        let mut rec = WalletRecord::new(&w, WalletRole::Main, Utc::now());
        rec.private_key = String::new();
        assert_eq!(
            secrets.signer_for("wallet_A", &rec).unwrap().address(),
            w.address()
        );

        let rec = WalletRecord::new(&other, WalletRole::EnergyProvider, Utc::now());
        assert!(secrets.signer_for("wallet_B", &rec).is_err());
    }
}
