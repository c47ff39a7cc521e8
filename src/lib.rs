//! Peer-to-peer ledger node.
//!
//! Provides the signed block chain with its stores, canonical encoding and hashing, key
//! handling, and the gossip network through which nodes discover each other.

pub mod core;
pub mod crypto;
pub mod network;
pub mod storage;
pub mod types;
pub mod utils;
