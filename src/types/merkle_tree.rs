//! Binary merkle tree over transaction hashes.
//!
//! Levels with an odd number of nodes pair their last node with itself. Both block
//! construction and validation go through [`MerkleTree::root`], so the rule is applied
//! identically on both sides.
//!
//! The rule has the usual duplicate-leaf ambiguity: `[a, b, c]` and `[a, b, c, c]` share a
//! root. A root therefore commits to the set of transactions up to a repeated last entry, and
//! callers must not treat two blocks with equal roots as having equal transaction lists.

use crate::core::transaction::Transaction;
use crate::types::hash::Hash;

/// Root of a block without transactions.
pub const EMPTY_ROOT: Hash = Hash::zero();

pub struct MerkleTree;

impl MerkleTree {
    fn hash_pair(left: &Hash, right: &Hash) -> Hash {
        let mut h = Hash::sha256();
        h.update(left.as_slice());
        h.update(right.as_slice());
        h.finalize()
    }

    /// Reduces `leaves` to a single root, in place.
    pub fn root(mut leaves: Vec<Hash>) -> Hash {
        if leaves.is_empty() {
            return EMPTY_ROOT;
        }

        let mut len = leaves.len();
        while len > 1 {
            let mut write = 0;
            for read in (0..len).step_by(2) {
                let left = leaves[read];
                let right = if read + 1 < len { leaves[read + 1] } else { left };
                leaves[write] = Self::hash_pair(&left, &right);
                write += 1;
            }
            len = write;
        }

        leaves[0]
    }

    /// Merkle root over `Transaction::hash` of each transaction, in order.
    pub fn from_transactions(transactions: &[Transaction]) -> Hash {
        Self::root(transactions.iter().map(Transaction::hash).collect())
    }
}
