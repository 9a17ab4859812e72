pub mod abi;
pub mod address;
pub mod error;
pub mod http;
pub mod protocol;
pub mod resources;
pub mod sender;
pub mod wallet;

pub use abi::Trc20Abi;
pub use address::TronAddress;
pub use error::{NodeErrorKind, classify_error, classify_node_error};
pub use http::TronHttp;
pub use resources::{AccountResources, ChainFees, ResourceStakeTotals};
pub use sender::{FeePolicy, SignedTronTx};
pub use wallet::{TronWallet, TxSigner};

/// 1 TRX = 1_000_000 sun.
pub const SUN_PER_TRX: u64 = 1_000_000;
