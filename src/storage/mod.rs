//! Storage subsystem.
//!
//! - [`storage_trait`]: the block, transaction and UTXO store capabilities
//! - [`memory`]: lock-guarded in-memory implementations

pub mod memory;
pub mod storage_trait;
