//! Test helpers.

#[cfg(test)]
pub mod utils {
    use crate::core::block::{Block, Header};
    use crate::core::transaction::Transaction;
    use crate::crypto::key_pair::PrivateKey;
    use crate::types::hash::{HASH_LEN, Hash};
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(1);

    /// Unique, non-zero hash per call.
    pub fn random_hash() -> Hash {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut value = [0u8; HASH_LEN];
        value[..8].copy_from_slice(&n.to_le_bytes());
        Hash(value)
    }

    /// Signed block at `height` on top of `prev_hash`.
    pub fn random_block(
        height: u32,
        prev_hash: Hash,
        transactions: Vec<Transaction>,
        key: &PrivateKey,
    ) -> Block {
        let header = Header {
            version: 1,
            height,
            prev_hash,
            root_hash: Hash::zero(),
            timestamp: COUNTER.fetch_add(1, Ordering::Relaxed) as i64,
        };
        Block::new(header, transactions, key)
    }
}
