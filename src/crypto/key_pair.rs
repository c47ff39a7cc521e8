//! Schnorr key pairs over secp256k1.
//!
//! Keys and signatures have fixed sizes ([`PUBLIC_KEY_LEN`], [`SIGNATURE_LEN`]); callers holding
//! raw bytes from the wire check those lengths through [`PublicKey::from_bytes`] and
//! [`Signature::from_bytes`] before anything reaches the verifier.
//!
//! An address is the last 20 bytes of `SHA3-256(public_key)`.

use crate::types::address::{ADDRESS_LEN, Address};
use k256::schnorr::signature::{Signer, Verifier};
use k256::schnorr::{SigningKey, VerifyingKey};
use ledger_derive::Error;
use rand_core::OsRng;
use sha3::{Digest, Sha3_256};
use std::fmt;
use zeroize::Zeroizing;

pub const PUBLIC_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;
pub const SEED_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("bytes do not encode a valid key")]
    InvalidKey,
    #[error("seed is not valid hex")]
    InvalidHex,
}

fn check_len(bytes: &[u8], expected: usize) -> Result<(), KeyError> {
    if bytes.len() != expected {
        return Err(KeyError::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

#[derive(Clone)]
pub struct PrivateKey {
    key: SigningKey,
}

impl PrivateKey {
    /// Fresh key from OS randomness.
    pub fn new() -> Self {
        Self {
            key: SigningKey::random(&mut OsRng),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        check_len(bytes, SEED_LEN)?;
        SigningKey::from_bytes(bytes)
            .map(|key| Self { key })
            .map_err(|_| KeyError::InvalidKey)
    }

    /// Deterministic key from a hex-encoded 32-byte seed. Used for the well-known genesis signer.
    pub fn from_seed_hex(seed: &str) -> Result<Self, KeyError> {
        let bytes = Zeroizing::new(hex::decode(seed).map_err(|_| KeyError::InvalidHex)?);
        Self::from_bytes(&bytes)
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            key: *self.key.verifying_key(),
        }
    }

    pub fn sign(&self, data: &[u8]) -> Signature {
        let signature: k256::schnorr::Signature = self.key.sign(data);
        Signature(signature.to_bytes())
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

#[derive(Clone, Copy)]
pub struct PublicKey {
    key: VerifyingKey,
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        check_len(bytes, PUBLIC_KEY_LEN)?;
        VerifyingKey::from_bytes(bytes)
            .map(|key| Self { key })
            .map_err(|_| KeyError::InvalidKey)
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.key.to_bytes().into()
    }

    pub fn address(&self) -> Address {
        let digest: [u8; 32] = Sha3_256::digest(self.to_bytes()).into();
        let mut address = [0u8; ADDRESS_LEN];
        address.copy_from_slice(&digest[32 - ADDRESS_LEN..]);
        Address(address)
    }

    pub fn verify(&self, data: &[u8], signature: &Signature) -> bool {
        match k256::schnorr::Signature::try_from(signature.0.as_slice()) {
            Ok(parsed) => self.key.verify(data, &parsed).is_ok(),
            Err(_) => false,
        }
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.to_bytes()))
    }
}

/// Raw 64-byte Schnorr signature. Parsed into curve points only when verified.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; SIGNATURE_LEN]);

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        check_len(bytes, SIGNATURE_LEN)?;
        let mut raw = [0u8; SIGNATURE_LEN];
        raw.copy_from_slice(bytes);
        Ok(Self(raw))
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}
