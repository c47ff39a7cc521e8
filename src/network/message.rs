//! Messages exchanged between nodes.
//!
//! Every frame on a connection carries one [`Request`] from the dialer or one [`Response`]
//! from the listener, in the canonical binary encoding.

use crate::core::transaction::Transaction;
use ledger_derive::BinaryCodec;

/// A node's self-description, exchanged in both directions of a handshake.
#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct Version {
    pub version: String,
    /// Height of the sender's chain tip.
    pub height: u32,
    /// Address the sender accepts connections on; peers are identified by it.
    pub listen_addr: String,
    /// Listen addresses of the sender's connected peers.
    pub peer_list: Vec<String>,
}

/// Acknowledges a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BinaryCodec)]
pub struct Ack;

#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub enum Request {
    Handshake(Version),
    Transaction(Transaction),
}

#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub enum Response {
    Version(Version),
    Ack(Ack),
    /// The request was understood but could not be served.
    Error(String),
}

impl Response {
    /// Name of the variant, for error reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Version(_) => "version",
            Response::Ack(_) => "ack",
            Response::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::TxOutput;
    use crate::types::address::Address;
    use crate::types::encoding::{Decode, DecodeError, Encode};

    fn version() -> Version {
        Version {
            version: "0.0.1".into(),
            height: 4,
            listen_addr: "127.0.0.1:3000".into(),
            peer_list: vec!["127.0.0.1:4000".into()],
        }
    }

    #[test]
    fn request_tags_follow_variant_order() {
        assert_eq!(Request::Handshake(version()).to_bytes()[0], 0);

        let tx = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![TxOutput {
                amount: 1,
                address: Address::default(),
            }],
        };
        let request = Request::Transaction(tx);
        let bytes = request.to_bytes();
        assert_eq!(bytes[0], 1);
        assert_eq!(Request::from_bytes(&bytes).unwrap(), request);
    }

    #[test]
    fn ack_is_a_single_tag_byte() {
        assert_eq!(Response::Ack(Ack).to_bytes().as_slice(), &[1]);
        assert!(Ack.to_bytes().is_empty());
    }

    #[test]
    fn version_response_decodes() {
        let response = Response::Version(version());
        assert_eq!(Response::from_bytes(&response.to_bytes()).unwrap(), response);
        assert_eq!(response.kind(), "version");
    }

    #[test]
    fn unknown_response_tag_is_rejected() {
        assert_eq!(Response::from_bytes(&[7]), Err(DecodeError::InvalidValue));
    }
}
