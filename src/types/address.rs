use ledger_derive::BinaryCodec;
use std::fmt;

pub const ADDRESS_LEN: usize = 20;

/// Account address derived from a public key (see `PublicKey::address`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Ord, PartialOrd, BinaryCodec)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}
