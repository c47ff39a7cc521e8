//! Block and header structures.
//!
//! A block is identified by the hash of its header alone. The signer signs that hash, and the
//! next block's `prev_hash` references it, so one hashing scheme covers signing and chaining.

use crate::core::transaction::Transaction;
use crate::crypto::key_pair::{PrivateKey, PublicKey, Signature};
use crate::types::bytes::Bytes;
use crate::types::hash::Hash;
use crate::types::merkle_tree::MerkleTree;
use ledger_derive::BinaryCodec;

#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct Header {
    pub version: i32,
    /// Position in the chain, genesis = 0
    pub height: u32,
    /// Hash of the parent header
    pub prev_hash: Hash,
    /// Merkle root of the transactions, zero when there are none
    pub root_hash: Hash,
    pub timestamp: i64,
}

impl Header {
    /// SHA-256 over the canonical header encoding.
    pub fn hash(&self) -> Hash {
        Hash::of(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    pub public_key: Bytes,
    pub signature: Bytes,
}

impl Block {
    /// Builds a signed block. The merkle root is written into the header before signing.
    pub fn new(header: Header, transactions: Vec<Transaction>, key: &PrivateKey) -> Self {
        let mut block = Self {
            header,
            transactions,
            public_key: Bytes::empty(),
            signature: Bytes::empty(),
        };
        block.header.root_hash = MerkleTree::from_transactions(&block.transactions);
        block.sign(key);
        block
    }

    /// Block hash, i.e. the header hash.
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Signs the current header hash and embeds the signer's public key.
    pub fn sign(&mut self, key: &PrivateKey) -> Signature {
        let signature = key.sign(self.hash().as_slice());
        self.public_key = Bytes::from(key.public_key().to_bytes());
        self.signature = Bytes::from(signature.to_bytes());
        signature
    }

    /// Verifies the embedded signature over the header hash.
    ///
    /// Keys or signatures of the wrong length are rejected before the verifier runs.
    pub fn verify_signature(&self) -> bool {
        let Ok(public_key) = PublicKey::from_bytes(&self.public_key) else {
            return false;
        };
        let Ok(signature) = Signature::from_bytes(&self.signature) else {
            return false;
        };
        public_key.verify(self.hash().as_slice(), &signature)
    }

    pub fn verify_root_hash(&self) -> bool {
        MerkleTree::from_transactions(&self.transactions) == self.header.root_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{TxInput, TxOutput};
    use crate::types::address::Address;
    use crate::utils::test_utils::utils::{random_block, random_hash};

    fn signed_tx(key: &PrivateKey, amount: i64) -> Transaction {
        let mut tx = Transaction {
            version: 1,
            inputs: vec![TxInput::new(random_hash(), 0, &key.public_key())],
            outputs: vec![TxOutput {
                amount,
                address: Address::default(),
            }],
        };
        tx.sign_inputs(key);
        tx
    }

    #[test]
    fn new_block_is_signed_and_rooted() {
        let key = PrivateKey::new();
        let block = random_block(1, random_hash(), vec![signed_tx(&key, 10)], &key);

        assert!(block.verify_signature());
        assert!(block.verify_root_hash());
        assert_eq!(block.public_key.len(), 32);
        assert_eq!(block.signature.len(), 64);
    }

    #[test]
    fn block_hash_is_the_header_hash() {
        let key = PrivateKey::new();
        let block = random_block(3, random_hash(), vec![signed_tx(&key, 1)], &key);

        let mut stripped = block.clone();
        stripped.transactions.clear();
        assert_eq!(block.hash(), stripped.hash());
        assert_eq!(block.hash(), block.header.hash());
    }

    #[test]
    fn signature_from_other_key_fails() {
        let key = PrivateKey::new();
        let other = PrivateKey::new();
        let mut block = random_block(1, random_hash(), vec![], &key);

        block.public_key = Bytes::from(other.public_key().to_bytes());
        assert!(!block.verify_signature());
    }

    #[test]
    fn header_edit_invalidates_signature() {
        let key = PrivateKey::new();
        let mut block = random_block(1, random_hash(), vec![], &key);

        block.header.height = 2;
        assert!(!block.verify_signature());

        block.sign(&key);
        assert!(block.verify_signature());
    }

    #[test]
    fn bad_lengths_fail_verification() {
        let key = PrivateKey::new();
        let mut block = random_block(1, random_hash(), vec![], &key);

        block.signature = Bytes::from(vec![0u8; 10]);
        assert!(!block.verify_signature());

        let mut block = random_block(1, random_hash(), vec![], &key);
        block.public_key = Bytes::empty();
        assert!(!block.verify_signature());
    }

    #[test]
    fn tampered_transaction_breaks_root() {
        let key = PrivateKey::new();
        let mut block = random_block(
            1,
            random_hash(),
            vec![signed_tx(&key, 10), signed_tx(&key, 20)],
            &key,
        );
        assert!(block.verify_root_hash());

        block.transactions[1].outputs[0].amount = 21;
        assert!(!block.verify_root_hash());
        // The header hash does not cover the transactions, so only the root check catches this.
        assert!(block.verify_signature());
    }

    #[test]
    fn empty_block_has_zero_root() {
        let key = PrivateKey::new();
        let block = random_block(1, random_hash(), vec![], &key);
        assert!(block.header.root_hash.is_zero());
        assert!(block.verify_root_hash());
    }
}
