//! Outbound connection abstractions.
//!
//! A [`Dialer`] opens connections; a [`Peer`] is a live handle to one remote node on which the
//! two RPCs can be issued. The node depends only on these traits, so tests can substitute
//! in-memory peers for TCP.

use crate::core::transaction::Transaction;
use crate::network::message::{Ack, Version};
use crate::types::encoding::DecodeError;
use std::io;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("failed to dial {addr}: {source}")]
    Dial {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} timed out")]
    Timeout(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed message: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid frame length {0}")]
    InvalidFrameLen(usize),

    #[error("connection closed by peer")]
    Closed,

    #[error("unexpected {0} response")]
    UnexpectedResponse(&'static str),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("refusing to connect to own listen address {0}")]
    SelfConnection(String),

    #[error("node is already started")]
    AlreadyStarted,
}

/// A live connection to a remote node.
#[async_trait::async_trait]
pub trait Peer: Send + Sync {
    /// Address this handle was dialed on.
    fn addr(&self) -> &str;

    /// False once the connection can no longer carry requests.
    fn is_open(&self) -> bool {
        true
    }

    /// Sends our version and returns the remote's.
    async fn handshake(&self, ours: Version) -> Result<Version, NetworkError>;

    async fn send_transaction(&self, tx: Transaction) -> Result<Ack, NetworkError>;
}

/// Opens connections to remote nodes.
#[async_trait::async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, addr: &str) -> Result<Arc<dyn Peer>, NetworkError>;
}
