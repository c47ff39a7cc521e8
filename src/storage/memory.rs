//! In-memory stores, the default backends.
//!
//! Each is a `HashMap` behind an `RwLock`: concurrent readers, exclusive writers, no ordering
//! across keys. A poisoned lock is recovered, since every write leaves the map consistent.

use crate::core::block::Block;
use crate::core::transaction::Transaction;
use crate::storage::storage_trait::{BlockStore, StorageError, TransactionStore, Utxo, UtxoStore};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A string-keyed map shared by all three stores.
struct Table<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V: Clone> Table<V> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, V>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, V>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, key: String, value: V) {
        self.write().insert(key, value);
    }

    fn get(&self, key: &str) -> Result<V, StorageError> {
        self.read()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn remove(&self, key: &str) -> Result<V, StorageError> {
        self.write()
            .remove(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn len(&self) -> usize {
        self.read().len()
    }
}

pub struct MemoryBlockStore {
    blocks: Table<Arc<Block>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self {
            blocks: Table::new(),
        }
    }
}

impl Default for MemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore for MemoryBlockStore {
    fn put(&self, block: Arc<Block>) -> Result<(), StorageError> {
        self.blocks.insert(block.hash().to_hex(), block);
        Ok(())
    }

    fn get(&self, hash_hex: &str) -> Result<Arc<Block>, StorageError> {
        self.blocks.get(hash_hex)
    }

    fn len(&self) -> usize {
        self.blocks.len()
    }
}

pub struct MemoryTxStore {
    transactions: Table<Arc<Transaction>>,
}

impl MemoryTxStore {
    pub fn new() -> Self {
        Self {
            transactions: Table::new(),
        }
    }
}

impl Default for MemoryTxStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionStore for MemoryTxStore {
    fn put(&self, tx: Arc<Transaction>) -> Result<(), StorageError> {
        self.transactions.insert(tx.hash().to_hex(), tx);
        Ok(())
    }

    fn get(&self, hash_hex: &str) -> Result<Arc<Transaction>, StorageError> {
        self.transactions.get(hash_hex)
    }

    fn len(&self) -> usize {
        self.transactions.len()
    }
}

pub struct MemoryUtxoStore {
    utxos: Table<Utxo>,
}

impl MemoryUtxoStore {
    pub fn new() -> Self {
        Self {
            utxos: Table::new(),
        }
    }
}

impl Default for MemoryUtxoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UtxoStore for MemoryUtxoStore {
    fn put(&self, utxo: Utxo) -> Result<(), StorageError> {
        self.utxos.insert(utxo.key(), utxo);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Utxo, StorageError> {
        self.utxos.get(key)
    }

    fn remove(&self, key: &str) -> Result<Utxo, StorageError> {
        self.utxos.remove(key)
    }

    fn len(&self) -> usize {
        self.utxos.len()
    }
}
