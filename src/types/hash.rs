//! 32-byte SHA-256 hash, the canonical digest of headers, transactions and merkle nodes.

use crate::types::encoding::{Encode, EncodeSink};
use ledger_derive::BinaryCodec;
use sha2::{Digest, Sha256};
use std::fmt;

pub const HASH_LEN: usize = 32;

/// Fixed-size hash. `Copy` because it is passed around constantly during validation.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash, Ord, PartialOrd, BinaryCodec)]
pub struct Hash(pub [u8; HASH_LEN]);

impl Hash {
    /// All-zero hash: the previous hash of genesis and the root of an empty transaction list.
    pub const fn zero() -> Hash {
        Hash([0u8; HASH_LEN])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LEN]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Incremental SHA-256 builder.
    pub fn sha256() -> HashBuilder {
        HashBuilder::new()
    }

    /// SHA-256 over the canonical encoding of `value`, streamed without an intermediate buffer.
    pub fn of<T: Encode + ?Sized>(value: &T) -> Hash {
        let mut builder = HashBuilder::new();
        value.encode(&mut builder);
        builder.finalize()
    }

    /// Lowercase hex, the key format used by every store.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Option<Hash> {
        let mut out = [0u8; HASH_LEN];
        hex::decode_to_slice(s, &mut out).ok()?;
        Some(Hash(out))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

/// Streaming SHA-256; an [`EncodeSink`] so encodable values hash without a byte buffer.
pub struct HashBuilder {
    hasher: Sha256,
}

impl HashBuilder {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    pub fn finalize(self) -> Hash {
        Hash(self.hasher.finalize().into())
    }
}

impl Default for HashBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeSink for HashBuilder {
    fn write(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_input() {
        let hash = Hash::sha256().finalize();
        assert_eq!(
            hash.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn streaming_matches_single_update() {
        let mut split = Hash::sha256();
        split.update(b"led");
        split.update(b"ger");

        let mut whole = Hash::sha256();
        whole.update(b"ledger");

        assert_eq!(split.finalize(), whole.finalize());
    }

    #[test]
    fn of_hashes_the_canonical_encoding() {
        let value = 42u32;
        let mut manual = Hash::sha256();
        manual.update(&value.to_bytes());
        assert_eq!(Hash::of(&value), manual.finalize());
    }

    #[test]
    fn hex_round_trip() {
        let hash = Hash::of("abc");
        assert_eq!(Hash::from_hex(&hash.to_hex()), Some(hash));
        assert_eq!(hash.to_string(), hash.to_hex());
        assert_eq!(Hash::from_hex("zz"), None);
    }

    #[test]
    fn zero_hash() {
        assert!(Hash::zero().is_zero());
        assert!(!Hash::of(&1u8).is_zero());
    }
}
