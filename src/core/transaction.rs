//! UTXO-style transactions.
//!
//! Each input names an output of an earlier transaction and carries the spender's public key
//! plus a signature over [`Transaction::signing_hash`]: the transaction hash computed with every
//! input signature blanked, so the signature never signs itself.

use crate::crypto::key_pair::{PrivateKey, PublicKey, Signature};
use crate::types::address::Address;
use crate::types::bytes::Bytes;
use crate::types::hash::Hash;
use ledger_derive::BinaryCodec;

#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct TxInput {
    /// Hash of the transaction whose output is being spent.
    pub prev_tx_hash: Hash,
    pub prev_out_index: u32,
    pub public_key: Bytes,
    pub signature: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct TxOutput {
    pub amount: i64,
    /// Recipient address, never the raw public key.
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl TxInput {
    /// Unsigned input spending `prev_out_index` of `prev_tx_hash` with `owner`'s key.
    pub fn new(prev_tx_hash: Hash, prev_out_index: u32, owner: &PublicKey) -> Self {
        Self {
            prev_tx_hash,
            prev_out_index,
            public_key: Bytes::from(owner.to_bytes()),
            signature: Bytes::empty(),
        }
    }
}

impl Transaction {
    /// Canonical hash, signatures included. Identifies the transaction in stores and merkle trees.
    pub fn hash(&self) -> Hash {
        Hash::of(self)
    }

    /// Hash of this transaction with every input signature cleared.
    pub fn signing_hash(&self) -> Hash {
        let mut unsigned = self.clone();
        for input in &mut unsigned.inputs {
            input.signature = Bytes::empty();
        }
        unsigned.hash()
    }

    pub fn sign(&self, key: &PrivateKey) -> Signature {
        key.sign(self.signing_hash().as_slice())
    }

    /// Signs every input with `key`, setting its public key first.
    pub fn sign_inputs(&mut self, key: &PrivateKey) {
        let public_key = Bytes::from(key.public_key().to_bytes());
        for input in &mut self.inputs {
            input.public_key = public_key.clone();
        }

        let signature = Bytes::from(self.sign(key).to_bytes());
        for input in &mut self.inputs {
            input.signature = signature.clone();
        }
    }

    /// Checks every input signature against its embedded public key.
    ///
    /// Inputs with a missing or malformed key or signature make the transaction invalid.
    pub fn verify(&self) -> bool {
        let hash = self.signing_hash();

        self.inputs.iter().all(|input| {
            let Ok(public_key) = PublicKey::from_bytes(&input.public_key) else {
                return false;
            };
            let Ok(signature) = Signature::from_bytes(&input.signature) else {
                return false;
            };
            public_key.verify(hash.as_slice(), &signature)
        })
    }
}
