//! HTTP-level tests for the manager: an in-process fake full node plus helpers wiring a
//! `Manager<TronChain>` to it.

pub mod fake_node;
pub mod util;
