//! Pool of verified transactions received from peers, awaiting inclusion in a block.

use crate::core::transaction::Transaction;
use crate::types::hash::Hash;
use dashmap::DashMap;
use std::sync::{PoisonError, RwLock};

/// Default transaction pool capacity.
pub const TXPOOL_CAPACITY: usize = 100_000;

/// Thread-safe pool of pending transactions.
///
/// Keeps insertion order alongside a hash index for duplicate detection.
pub struct TxPool {
    capacity: usize,
    transactions: DashMap<Hash, Transaction>,
    order: RwLock<Vec<Hash>>,
}

impl TxPool {
    /// Uses [`TXPOOL_CAPACITY`] when `capacity` is `None`.
    pub fn new(capacity: Option<usize>) -> Self {
        let capacity = capacity.unwrap_or(TXPOOL_CAPACITY);
        Self {
            capacity,
            transactions: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.transactions.contains_key(hash)
    }

    /// Adds `transaction` unless it is already pooled or the pool is full.
    ///
    /// Returns whether it was added.
    pub fn append(&self, transaction: Transaction) -> bool {
        let hash = transaction.hash();
        let mut order = self.order.write().unwrap_or_else(PoisonError::into_inner);
        if order.len() >= self.capacity || self.transactions.contains_key(&hash) {
            return false;
        }

        order.push(hash);
        self.transactions.insert(hash, transaction);
        true
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// All pooled transactions in insertion order.
    pub fn transactions(&self) -> Vec<Transaction> {
        let order = self.order.read().unwrap_or_else(PoisonError::into_inner);
        order
            .iter()
            .filter_map(|h| self.transactions.get(h).map(|e| e.clone()))
            .collect()
    }

    pub fn flush(&self) {
        let mut order = self.order.write().unwrap_or_else(PoisonError::into_inner);
        order.clear();
        self.transactions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{TxInput, TxOutput};
    use crate::crypto::key_pair::PrivateKey;
    use crate::utils::test_utils::utils::random_hash;

    fn signed_tx(amount: i64) -> Transaction {
        let key = PrivateKey::new();
        let mut tx = Transaction {
            version: 1,
            inputs: vec![TxInput::new(random_hash(), 0, &key.public_key())],
            outputs: vec![TxOutput {
                amount,
                address: key.public_key().address(),
            }],
        };
        tx.sign_inputs(&key);
        tx
    }

    #[test]
    fn duplicates_are_rejected() {
        let pool = TxPool::new(None);
        assert!(pool.is_empty());

        let tx = signed_tx(5);
        assert!(pool.append(tx.clone()));
        assert!(!pool.append(tx.clone()));

        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&tx.hash()));
    }

    #[test]
    fn insertion_order_is_kept() {
        let pool = TxPool::new(None);
        let txs: Vec<_> = (0..50).map(signed_tx).collect();
        for tx in &txs {
            pool.append(tx.clone());
        }

        let pooled = pool.transactions();
        assert_eq!(pooled.len(), txs.len());
        for (i, (a, b)) in pooled.iter().zip(&txs).enumerate() {
            assert_eq!(a.hash(), b.hash(), "failed at index {i}");
        }
    }

    #[test]
    fn full_pool_refuses_new_transactions() {
        let pool = TxPool::new(Some(2));
        assert!(pool.append(signed_tx(1)));
        assert!(pool.append(signed_tx(2)));
        assert!(!pool.append(signed_tx(3)));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn flush_empties_the_pool() {
        let pool = TxPool::new(None);
        for i in 0..5 {
            pool.append(signed_tx(i));
        }

        pool.flush();
        assert!(pool.is_empty());
        assert!(pool.transactions().is_empty());
        assert!(pool.append(signed_tx(9)));
    }
}
