//! Peer-to-peer layer: framing, messages, the node service and peer discovery.
//!
//! - [`message`]: Request/response types exchanged between nodes
//! - [`codec`]: Length-prefixed framing over async streams
//! - [`transport`]: `Dialer`/`Peer` abstractions and network errors
//! - [`tcp_transport`]: TCP dialer and peer connection
//! - [`server`]: Accept loop dispatching requests to a `NodeService`
//! - [`peer_table`]: Known peers keyed by listen address
//! - [`txpool`]: Pending verified transactions
//! - [`node`]: Gossip node tying it all together

pub mod codec;
pub mod message;
pub mod node;
pub mod peer_table;
pub mod server;
pub mod tcp_transport;
pub mod transport;
pub mod txpool;
