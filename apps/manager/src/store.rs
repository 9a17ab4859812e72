use crate::profile::{BudgetProfile, wallet_name};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tron::{SUN_PER_TRX, TronAddress, TronWallet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletRole {
    Main,
    #[serde(alias = "energy")]
    EnergyProvider,
}

impl WalletRole {
    pub fn label(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::EnergyProvider => "energy provider",
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub address: String,
    pub private_key: String,
    pub role: WalletRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_trx: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "timestamp")]
    pub created_time: DateTime<Utc>,
    #[serde(default)]
    pub frozen_sun: u64,
    #[serde(default)]
    pub energy_balance: u64,
    #[serde(default, with = "timestamp::option")]
    pub last_freeze_time: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub last_unfreeze_time: Option<DateTime<Utc>>,
    /// Older files stored frozen TRX as a float; folded into `frozen_sun` on load.
    #[serde(default, rename = "frozen_trx", skip_serializing)]
    legacy_frozen_trx: Option<f64>,
}

impl std::fmt::Debug for WalletRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletRecord")
            .field("address", &self.address)
            .field("role", &self.role)
            .field("display_name", &self.display_name)
            .field("frozen_sun", &self.frozen_sun)
            .field("energy_balance", &self.energy_balance)
            .finish_non_exhaustive()
    }
}

impl WalletRecord {
    pub fn new(wallet: &TronWallet, role: WalletRole, now: DateTime<Utc>) -> Self {
        Self {
            address: wallet.address().to_base58check(),
            private_key: wallet.private_key_hex(),
            role,
            display_name: None,
            recommended_trx: None,
            description: None,
            created_time: now,
            frozen_sun: 0,
            energy_balance: 0,
            last_freeze_time: None,
            last_unfreeze_time: None,
            legacy_frozen_trx: None,
        }
    }

    pub fn tron_address(&self) -> Result<TronAddress> {
        TronAddress::parse_text(&self.address)
            .with_context(|| format!("invalid wallet address {}", self.address))
    }

    /// Display name when present, otherwise the wallet key.
    pub fn label<'a>(&'a self, name: &'a str) -> &'a str {
        self.display_name.as_deref().unwrap_or(name)
    }

    fn fold_legacy(&mut self) {
        if let Some(trx) = self.legacy_frozen_trx.take() {
            if self.frozen_sun == 0 && trx.is_finite() && trx > 0.0 {
                self.frozen_sun = (trx * SUN_PER_TRX as f64).round() as u64;
            }
        }
    }
}

/// On-disk wallet set: `{ wallets, main_wallet, budget_type, last_updated }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletFile {
    #[serde(default)]
    pub wallets: BTreeMap<String, WalletRecord>,
    #[serde(default)]
    pub main_wallet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_type: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl WalletFile {
    /// A set `main_wallet` must name a record whose role is `main`.
    pub fn validate(&self) -> Result<()> {
        for (name, w) in &self.wallets {
            w.tron_address()
                .with_context(|| format!("wallet {name} has an invalid address"))?;
        }
        if let Some(main) = &self.main_wallet {
            let found = self.wallets.values().find(|w| &w.address == main);
            match found {
                None => anyhow::bail!("main_wallet {main} does not match any wallet record"),
                Some(w) if w.role != WalletRole::Main => {
                    anyhow::bail!("main_wallet {main} refers to a wallet whose role is not main")
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    pub fn main_entry(&self) -> Option<(&String, &WalletRecord)> {
        let main = self.main_wallet.as_ref()?;
        self.wallets.iter().find(|(_, w)| &w.address == main)
    }

    /// Energy providers in wallet-list (name) order.
    pub fn providers(&self) -> impl Iterator<Item = (&String, &WalletRecord)> {
        self.wallets
            .iter()
            .filter(|(_, w)| w.role == WalletRole::EnergyProvider)
    }

    pub fn find_by_address(&self, address: &str) -> Option<(&String, &WalletRecord)> {
        self.wallets.iter().find(|(_, w)| w.address == address)
    }

    pub fn next_free_name(&self) -> String {
        (0..)
            .map(wallet_name)
            .find(|n| !self.wallets.contains_key(n))
            .unwrap_or_else(|| format!("wallet_{}", self.wallets.len() + 1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    pub wallets: BTreeMap<String, WalletRecord>,
    pub main_wallet: Option<String>,
    #[serde(with = "timestamp")]
    pub backup_time: DateTime<Utc>,
    pub backup_version: String,
    pub note: String,
}

pub const BACKUP_VERSION: &str = "1.0";

/// Single owner of the wallet file.
#[derive(Debug)]
pub struct WalletStore {
    path: PathBuf,
    file: WalletFile,
}

impl WalletStore {
    /// A missing file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = if path.exists() {
            let s = fs::read_to_string(&path)
                .with_context(|| format!("read wallet file {}", path.display()))?;
            let mut file: WalletFile = serde_json::from_str(&s)
                .with_context(|| format!("parse wallet file {}", path.display()))?;
            for w in file.wallets.values_mut() {
                w.fold_legacy();
            }
            file.validate()
                .with_context(|| format!("invalid wallet file {}", path.display()))?;
            tracing::info!(
                path = %path.display(),
                wallets = file.wallets.len(),
                "wallet file loaded"
            );
            file
        } else {
            tracing::warn!(path = %path.display(), "wallet file not found; starting empty");
            WalletFile::default()
        };
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self) -> &WalletFile {
        &self.file
    }

    pub fn is_empty(&self) -> bool {
        self.file.wallets.is_empty()
    }

    pub fn get(&self, name: &str) -> Result<&WalletRecord> {
        self.file
            .wallets
            .get(name)
            .with_context(|| format!("unknown wallet {name}"))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut WalletRecord> {
        self.file
            .wallets
            .get_mut(name)
            .with_context(|| format!("unknown wallet {name}"))
    }

    pub fn main_address(&self) -> Result<TronAddress> {
        let (_, w) = self
            .file
            .main_entry()
            .context("main wallet is not set; generate or import wallets first")?;
        w.tron_address()
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.file.providers().map(|(n, _)| n.clone()).collect()
    }

    pub fn save(&mut self) -> Result<()> {
        self.file.validate().context("refusing to save wallet file")?;
        self.file.last_updated = Some(Utc::now());
        write_json_atomic(&self.path, &self.file)?;
        tracing::debug!(path = %self.path.display(), "wallet file saved");
        Ok(())
    }

    /// Replaces the whole wallet set with fresh keys laid out by `profile`.
    pub fn regenerate(&mut self, profile: &BudgetProfile) -> Result<()> {
        let now = Utc::now();
        let mut wallets = BTreeMap::new();
        let mut main_wallet = None;
        for (i, t) in profile.wallets.iter().enumerate() {
            let key = TronWallet::random();
            let mut rec = WalletRecord::new(&key, t.role, now);
            rec.display_name = t.display_name.map(str::to_string);
            rec.recommended_trx = t.recommended_trx;
            rec.description = t.description.map(str::to_string);
            if t.role == WalletRole::Main && main_wallet.is_none() {
                main_wallet = Some(rec.address.clone());
            }
            wallets.insert(wallet_name(i), rec);
        }
        self.file = WalletFile {
            wallets,
            main_wallet,
            budget_type: profile.budget_type.map(str::to_string),
            last_updated: None,
        };
        self.save()
    }

    /// Adds `wallet` under `name` (or the next free name). The first wallet of an empty store
    /// becomes the main wallet.
    pub fn import(&mut self, wallet: &TronWallet, name: Option<String>) -> Result<String> {
        let address = wallet.address().to_base58check();
        if let Some((existing, _)) = self.file.find_by_address(&address) {
            anyhow::bail!("address {address} is already stored as {existing}");
        }
        let name = name.unwrap_or_else(|| self.file.next_free_name());
        if self.file.wallets.contains_key(&name) {
            anyhow::bail!("wallet name {name} is already taken");
        }
        let role = if self.file.main_wallet.is_none() {
            WalletRole::Main
        } else {
            WalletRole::EnergyProvider
        };
        let rec = WalletRecord::new(wallet, role, Utc::now());
        if role == WalletRole::Main {
            self.file.main_wallet = Some(rec.address.clone());
        }
        self.file.wallets.insert(name.clone(), rec);
        self.save()?;
        Ok(name)
    }

    pub fn backup(&self, note: &str) -> Backup {
        Backup {
            wallets: self.file.wallets.clone(),
            main_wallet: self.file.main_wallet.clone(),
            backup_time: Utc::now(),
            backup_version: BACKUP_VERSION.to_string(),
            note: note.to_string(),
        }
    }
}

/// Writes pretty JSON to `path.tmp` and renames it over `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create dir {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(value).context("serialize json")?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

/// RFC3339 on write; also accepts naive ISO timestamps (read as UTC) from older files.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            return Some(t.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|n| n.and_utc())
    }

    pub fn serialize<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(d)?;
        parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {s:?}")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            t: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match t {
                Some(t) => s.serialize_some(&t.to_rfc3339()),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(d)? {
                None => Ok(None),
                Some(s) => super::parse(&s)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {s:?}"))),
            }
        }
    }
}
