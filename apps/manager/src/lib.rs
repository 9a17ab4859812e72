//! Wallet and energy manager for TRON: a wallet store, single-wallet operations, the
//! freeze-and-delegate rotation and budget strategies, all on top of the `tron` crate.

pub mod amount;
pub mod chain;
pub mod cli;
pub mod config;
pub mod history;
pub mod menu;
pub mod ops;
pub mod pacer;
pub mod profile;
pub mod report;
pub mod rotation;
pub mod secrets;
pub mod store;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{AccountState, Chain, Token, TronChain};
pub use ops::{AccountStatus, Manager, StepOutcome, WalletStep};
pub use profile::{BudgetKind, BudgetProfile};
pub use rotation::{DelegateOutcome, RotationReport, WalletOutcome};
pub use store::{WalletRecord, WalletRole, WalletStore};
