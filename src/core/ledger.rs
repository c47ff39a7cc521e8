//! The ledger: header chain, stores and block acceptance.
//!
//! `add_block` validates and commits under one exclusive section of the header lock, so two
//! concurrent callers can never both extend the same tip. Within a commit the stores are
//! written first and the header last: the height only advances once every store write
//! succeeded. The stores are not rolled back if a later write fails, so a failing durable
//! backend can leave orphaned transactions or UTXO changes behind an unchanged tip.

use crate::core::block::{Block, Header};
use crate::core::header_list::HeaderList;
use crate::core::transaction::{Transaction, TxOutput};
use crate::crypto::key_pair::{PrivateKey, PublicKey};
use crate::storage::memory::{MemoryBlockStore, MemoryTxStore, MemoryUtxoStore};
use crate::storage::storage_trait::{
    BlockStore, StorageError, TransactionStore, Utxo, UtxoStore, utxo_key,
};
use crate::types::address::Address;
use crate::types::hash::Hash;
use crate::{info, warn};
use ledger_derive::Error;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Hex seed of the well-known genesis signer. Public on purpose: it only signs genesis.
pub const GENESIS_SEED: &str = "d12cda4733e2e24377cc161b55bf447a13a615d48838b33ab7634b77531734dc";

/// Amount credited to the genesis signer's address.
pub const GENESIS_AMOUNT: i64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid block signature")]
    InvalidSignature,
    #[error("block root hash does not match its transactions")]
    InvalidMerkleRoot,
    #[error("prev block hash mismatch: tip is {expected}, block references {actual}")]
    PrevHashMismatch { expected: Hash, actual: Hash },
    #[error("transaction {tx} has output amounts that overflow")]
    InvalidOutputAmount { tx: Hash },
    #[error("given height ({requested}) too high - current height ({height})")]
    HeightTooHigh { requested: u32, height: u32 },
    #[error("{0}")]
    Storage(StorageError),
}

impl From<StorageError> for LedgerError {
    fn from(err: StorageError) -> Self {
        LedgerError::Storage(err)
    }
}

/// Read access to chain state needed by the network layer.
pub trait ChainReader: Send + Sync {
    fn height(&self) -> u32;
}

/// Deterministic genesis block: one output of [`GENESIS_AMOUNT`] to the seed key's address,
/// signed by the seed key.
pub fn genesis_block() -> Block {
    let key = match PrivateKey::from_seed_hex(GENESIS_SEED) {
        Ok(key) => key,
        Err(err) => panic!("genesis seed is invalid: {err}"),
    };

    let header = Header {
        version: 1,
        height: 0,
        prev_hash: Hash::zero(),
        root_hash: Hash::zero(),
        timestamp: 0,
    };
    let coinbase = Transaction {
        version: 1,
        inputs: vec![],
        outputs: vec![TxOutput {
            amount: GENESIS_AMOUNT,
            address: key.public_key().address(),
        }],
    };

    Block::new(header, vec![coinbase], &key)
}

pub struct Ledger<B = MemoryBlockStore, T = MemoryTxStore, U = MemoryUtxoStore>
where
    B: BlockStore,
    T: TransactionStore,
    U: UtxoStore,
{
    headers: RwLock<HeaderList>,
    block_store: B,
    tx_store: T,
    utxo_store: U,
}

impl Ledger {
    /// Ledger over fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(
            MemoryBlockStore::new(),
            MemoryTxStore::new(),
            MemoryUtxoStore::new(),
        )
    }
}

impl<B: BlockStore, T: TransactionStore, U: UtxoStore> Ledger<B, T, U> {
    /// Creates the ledger and commits genesis through the regular commit path.
    ///
    /// # Panics
    /// If the genesis commit fails.
    pub fn new(block_store: B, tx_store: T, utxo_store: U) -> Self {
        let ledger = Self {
            headers: RwLock::new(HeaderList::new()),
            block_store,
            tx_store,
            utxo_store,
        };

        let genesis = genesis_block();
        let mut headers = ledger.write_headers();
        if let Err(err) = ledger.commit(&mut headers, genesis) {
            panic!("failed to commit genesis block: {err}");
        }
        drop(headers);

        ledger
    }

    fn read_headers(&self) -> RwLockReadGuard<'_, HeaderList> {
        self.headers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_headers(&self) -> RwLockWriteGuard<'_, HeaderList> {
        self.headers.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn height(&self) -> u32 {
        self.read_headers().height()
    }

    /// Hash of the tip header.
    pub fn tip_hash(&self) -> Hash {
        self.read_headers()
            .tip()
            .map(Header::hash)
            .unwrap_or_default()
    }

    /// Validates `block` against the current tip and commits it.
    ///
    /// Nothing is written when validation fails.
    pub fn add_block(&self, block: Block) -> Result<(), LedgerError> {
        let mut headers = self.write_headers();
        Self::validate_against(&headers, &block)?;
        self.commit(&mut headers, block)
    }

    /// Runs the acceptance checks without committing.
    pub fn validate_block(&self, block: &Block) -> Result<(), LedgerError> {
        Self::validate_against(&self.read_headers(), block)
    }

    /// Signature, merkle root (only with transactions), output amounts, then linkage to the tip.
    fn validate_against(headers: &HeaderList, block: &Block) -> Result<(), LedgerError> {
        if !block.verify_signature() {
            return Err(LedgerError::InvalidSignature);
        }

        if !block.transactions.is_empty() && !block.verify_root_hash() {
            return Err(LedgerError::InvalidMerkleRoot);
        }

        for tx in &block.transactions {
            created_utxos(tx)?;
        }

        let expected = headers.tip().map(Header::hash).unwrap_or_default();
        if expected != block.header.prev_hash {
            return Err(LedgerError::PrevHashMismatch {
                expected,
                actual: block.header.prev_hash,
            });
        }

        Ok(())
    }

    fn commit(&self, headers: &mut HeaderList, block: Block) -> Result<(), LedgerError> {
        let block = Arc::new(block);

        for tx in &block.transactions {
            let tx = Arc::new(tx.clone());
            self.tx_store.put(Arc::clone(&tx))?;
            self.update_utxos(&tx)?;
        }

        self.block_store.put(Arc::clone(&block))?;
        headers.add(block.header.clone());

        info!(
            "Committed block: height={} hash={} transactions={}",
            headers.height(),
            block.hash(),
            block.transactions.len()
        );
        Ok(())
    }

    /// Spends the outputs referenced by `tx`'s inputs, then records its own outputs.
    fn update_utxos(&self, tx: &Transaction) -> Result<(), LedgerError> {
        for input in &tx.inputs {
            let Ok(owner) = PublicKey::from_bytes(&input.public_key) else {
                warn!(
                    "Input spending {} carries no valid public key, nothing to spend",
                    input.prev_tx_hash
                );
                continue;
            };

            let key = utxo_key(&owner.address(), &input.prev_tx_hash);
            match self.utxo_store.remove(&key) {
                Ok(_) => {}
                Err(StorageError::NotFound(_)) => warn!("Spent output {} was not unspent", key),
                Err(err) => return Err(err.into()),
            }
        }

        for utxo in created_utxos(tx)? {
            self.utxo_store.put(utxo)?;
        }
        Ok(())
    }

    pub fn get_block_by_hash(&self, hash: &Hash) -> Result<Arc<Block>, LedgerError> {
        Ok(self.block_store.get(&hash.to_hex())?)
    }

    pub fn get_block_by_height(&self, height: u32) -> Result<Arc<Block>, LedgerError> {
        let hash = {
            let headers = self.read_headers();
            if height > headers.height() {
                return Err(LedgerError::HeightTooHigh {
                    requested: height,
                    height: headers.height(),
                });
            }
            headers.get(height).hash()
        };
        self.get_block_by_hash(&hash)
    }

    pub fn get_transaction(&self, hash: &Hash) -> Result<Arc<Transaction>, LedgerError> {
        Ok(self.tx_store.get(&hash.to_hex())?)
    }

    pub fn get_utxo(&self, address: &Address, tx_hash: &Hash) -> Result<Utxo, LedgerError> {
        Ok(self.utxo_store.get(&utxo_key(address, tx_hash))?)
    }
}

/// One UTXO per recipient of `tx`, amounts to the same address summed.
fn created_utxos(tx: &Transaction) -> Result<Vec<Utxo>, LedgerError> {
    let tx_hash = tx.hash();
    let mut created: Vec<Utxo> = Vec::with_capacity(tx.outputs.len());
    for output in &tx.outputs {
        match created.iter_mut().find(|u| u.address == output.address) {
            Some(existing) => {
                existing.amount = existing
                    .amount
                    .checked_add(output.amount)
                    .ok_or(LedgerError::InvalidOutputAmount { tx: tx_hash })?;
            }
            None => created.push(Utxo {
                address: output.address,
                tx_hash,
                amount: output.amount,
            }),
        }
    }
    Ok(created)
}

impl<B: BlockStore, T: TransactionStore, U: UtxoStore> ChainReader for Ledger<B, T, U> {
    fn height(&self) -> u32 {
        self.read_headers().height()
    }
}
