//! Storage capabilities consumed by the ledger.
//!
//! Each store is a concurrency-safe map from a hex key to an entity. Blocks and transactions
//! are keyed by the hex of their canonical hash; unspent outputs by [`utxo_key`]. The ledger
//! depends only on these traits, so a durable backend can replace the in-memory maps in
//! [`crate::storage::memory`] without touching it.

use crate::core::block::Block;
use crate::core::transaction::Transaction;
use crate::types::address::Address;
use crate::types::hash::Hash;
use ledger_derive::{BinaryCodec, Error};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// No entity is stored under the requested key.
    #[error("no entry for key [{0}]")]
    NotFound(String),
    /// The backing store failed; only durable backends produce this.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// An unspent output created by a committed transaction.
///
/// Outputs of one transaction paying the same address share a key, so their amounts are summed.
#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct Utxo {
    pub address: Address,
    pub tx_hash: Hash,
    pub amount: i64,
}

impl Utxo {
    pub fn key(&self) -> String {
        utxo_key(&self.address, &self.tx_hash)
    }
}

/// `address || "_" || tx_hash`, both hex encoded.
pub fn utxo_key(address: &Address, tx_hash: &Hash) -> String {
    format!("{}_{}", address.to_hex(), tx_hash.to_hex())
}

pub trait BlockStore: Send + Sync {
    /// Stores `block` under the hex of its header hash.
    fn put(&self, block: Arc<Block>) -> Result<(), StorageError>;

    fn get(&self, hash_hex: &str) -> Result<Arc<Block>, StorageError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait TransactionStore: Send + Sync {
    /// Stores `tx` under the hex of its hash.
    fn put(&self, tx: Arc<Transaction>) -> Result<(), StorageError>;

    fn get(&self, hash_hex: &str) -> Result<Arc<Transaction>, StorageError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait UtxoStore: Send + Sync {
    /// Stores `utxo` under [`Utxo::key`], replacing any previous entry.
    fn put(&self, utxo: Utxo) -> Result<(), StorageError>;

    fn get(&self, key: &str) -> Result<Utxo, StorageError>;

    /// Removes and returns the entry, `NotFound` if there is none.
    fn remove(&self, key: &str) -> Result<Utxo, StorageError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utxo_key_joins_address_and_hash() {
        let address = Address([0xAB; 20]);
        let tx_hash = Hash([0x01; 32]);
        let key = utxo_key(&address, &tx_hash);

        assert_eq!(key, format!("{}_{}", "ab".repeat(20), "01".repeat(32)));
        let utxo = Utxo {
            address,
            tx_hash,
            amount: 5,
        };
        assert_eq!(utxo.key(), key);
    }

    #[test]
    fn not_found_reports_the_key() {
        let err = StorageError::NotFound("deadbeef".into());
        assert_eq!(err.to_string(), "no entry for key [deadbeef]");
    }
}
