//! Cheaply clonable, immutable byte buffer.
//!
//! Public keys and signatures are carried as `Bytes` inside blocks and transactions; blocks are
//! cloned into stores and responses, so sharing the allocation keeps those copies cheap.

use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink, read_bytes, read_len};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(Arc<Vec<u8>>);

impl Bytes {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(Arc::new(data.into()))
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self(Arc::new(data))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.as_ref().clone()
    }

    /// Mutable access, copying the buffer first if it is shared.
    pub fn make_mut(&mut self) -> &mut Vec<u8> {
        Arc::make_mut(&mut self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_slice())
    }
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes(0x{})", self.to_hex())
    }
}

impl Encode for Bytes {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.len().encode(out);
        out.write(self.as_slice());
    }
}

impl Decode for Bytes {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let len = read_len(input)?;
        Ok(Self::new(read_bytes(input, len)?))
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl From<&[u8]> for Bytes {
    fn from(data: &[u8]) -> Self {
        Self::new(data)
    }
}

impl<const N: usize> From<[u8; N]> for Bytes {
    fn from(data: [u8; N]) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_allocation() {
        let a = Bytes::new(vec![1, 2, 3]);
        let b = a.clone();
        assert!(Arc::ptr_eq(&a.0, &b.0));
    }

    #[test]
    fn make_mut_detaches_shared_buffer() {
        let a = Bytes::new(vec![1, 2, 3]);
        let mut b = a.clone();
        b.make_mut()[0] = 9;
        assert_eq!(a.as_slice(), &[1, 2, 3]);
        assert_eq!(b.as_slice(), &[9, 2, 3]);
    }

    #[test]
    fn encodes_like_a_byte_vector() {
        let bytes = Bytes::from(vec![7u8, 8]);
        let encoded = Encode::to_bytes(&bytes);
        assert_eq!(encoded, vec![7u8, 8].to_bytes());
        assert_eq!(Bytes::from_bytes(&encoded).unwrap(), bytes);
    }

    #[test]
    fn debug_prints_hex() {
        assert_eq!(format!("{:?}", Bytes::from([0xAB, 0x01])), "Bytes(0xab01)");
    }
}
