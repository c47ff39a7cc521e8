//! Known peers, keyed by the listen address they announce.
//!
//! An address is [`PeerSlot::Reserved`] while a dial to it is in flight and
//! [`PeerSlot::Connected`] once the handshake succeeded. Reserving is an atomic
//! check-and-insert, so two bootstrap tasks can never dial the same address at once.

use crate::network::message::Version;
use crate::network::transport::Peer;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub enum PeerSlot {
    Reserved,
    Connected {
        peer: Arc<dyn Peer>,
        version: Version,
    },
}

#[derive(Default)]
pub struct PeerTable {
    self_addr: OnceLock<String>,
    peers: RwLock<HashMap<String, PeerSlot>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records our own listen address. Only the first call has an effect.
    pub fn set_self_addr(&self, addr: impl Into<String>) {
        let _ = self.self_addr.set(addr.into());
    }

    fn is_self(&self, addr: &str) -> bool {
        self.self_addr.get().is_some_and(|own| own == addr)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, PeerSlot>> {
        self.peers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, PeerSlot>> {
        self.peers.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// True when `addr` is neither our own address nor already known, reserved or connected.
    pub fn can_connect_with(&self, addr: &str) -> bool {
        !self.is_self(addr) && !self.read().contains_key(addr)
    }

    /// Claims `addr` for dialing. Returns false if it is ours or already taken.
    pub fn reserve(&self, addr: &str) -> bool {
        if self.is_self(addr) {
            return false;
        }

        let mut peers = self.write();
        if peers.contains_key(addr) {
            return false;
        }
        peers.insert(addr.to_string(), PeerSlot::Reserved);
        true
    }

    /// Drops a reservation. Connected entries are left alone.
    pub fn release(&self, addr: &str) {
        let mut peers = self.write();
        if matches!(peers.get(addr), Some(PeerSlot::Reserved)) {
            peers.remove(addr);
        }
    }

    /// Stores a connected peer under `version.listen_addr`, replacing a reservation or an older
    /// connection for the same address. Returns false for our own address.
    pub fn register(&self, peer: Arc<dyn Peer>, version: Version) -> bool {
        if self.is_self(&version.listen_addr) {
            return false;
        }

        let addr = version.listen_addr.clone();
        self.write()
            .insert(addr, PeerSlot::Connected { peer, version });
        true
    }

    /// Removes `addr` entirely, returning the version it had announced if it was connected.
    pub fn remove(&self, addr: &str) -> Option<Version> {
        match self.write().remove(addr)? {
            PeerSlot::Connected { version, .. } => Some(version),
            PeerSlot::Reserved => None,
        }
    }

    pub fn get(&self, addr: &str) -> Option<Arc<dyn Peer>> {
        match self.read().get(addr)? {
            PeerSlot::Connected { peer, .. } => Some(peer.clone()),
            PeerSlot::Reserved => None,
        }
    }

    /// Listen addresses of connected peers, sorted.
    pub fn addresses(&self) -> Vec<String> {
        let mut addrs: Vec<String> = self
            .read()
            .iter()
            .filter(|(_, slot)| matches!(slot, PeerSlot::Connected { .. }))
            .map(|(addr, _)| addr.clone())
            .collect();
        addrs.sort();
        addrs
    }

    /// Number of connected peers.
    pub fn len(&self) -> usize {
        self.read()
            .values()
            .filter(|slot| matches!(slot, PeerSlot::Connected { .. }))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::Transaction;
    use crate::network::message::Ack;
    use crate::network::transport::NetworkError;

    struct DummyPeer(String);

    #[async_trait::async_trait]
    impl Peer for DummyPeer {
        fn addr(&self) -> &str {
            &self.0
        }

        async fn handshake(&self, ours: Version) -> Result<Version, NetworkError> {
            Ok(ours)
        }

        async fn send_transaction(&self, _tx: Transaction) -> Result<Ack, NetworkError> {
            Ok(Ack)
        }
    }

    fn connected(table: &PeerTable, addr: &str, height: u32) -> bool {
        let version = Version {
            version: "0.0.1".into(),
            height,
            listen_addr: addr.into(),
            peer_list: vec![],
        };
        table.register(Arc::new(DummyPeer(addr.into())), version)
    }

    #[test]
    fn self_address_is_never_accepted() {
        let table = PeerTable::new();
        table.set_self_addr("127.0.0.1:3000");

        assert!(!table.can_connect_with("127.0.0.1:3000"));
        assert!(!table.reserve("127.0.0.1:3000"));
        assert!(!connected(&table, "127.0.0.1:3000", 0));
        assert!(table.is_empty());
    }

    #[test]
    fn reservation_is_exclusive() {
        let table = PeerTable::new();
        assert!(table.reserve("127.0.0.1:4000"));
        assert!(!table.reserve("127.0.0.1:4000"));
        assert!(!table.can_connect_with("127.0.0.1:4000"));

        // Reserved entries are not peers yet.
        assert!(table.is_empty());
        assert!(table.get("127.0.0.1:4000").is_none());

        table.release("127.0.0.1:4000");
        assert!(table.can_connect_with("127.0.0.1:4000"));
    }

    #[test]
    fn register_replaces_reservation() {
        let table = PeerTable::new();
        assert!(table.reserve("127.0.0.1:4000"));
        assert!(connected(&table, "127.0.0.1:4000", 2));

        assert!(table.get("127.0.0.1:4000").is_some());
        assert_eq!(table.len(), 1);

        // Release leaves a connected peer in place.
        table.release("127.0.0.1:4000");
        assert!(table.get("127.0.0.1:4000").is_some());
    }

    #[test]
    fn listen_address_is_unique() {
        let table = PeerTable::new();
        connected(&table, "127.0.0.1:4000", 1);
        connected(&table, "127.0.0.1:4000", 7);

        assert_eq!(table.len(), 1);
        assert_eq!(table.remove("127.0.0.1:4000").unwrap().height, 7);
    }

    #[test]
    fn addresses_are_sorted_and_exclude_reservations() {
        let table = PeerTable::new();
        connected(&table, "127.0.0.1:5000", 0);
        connected(&table, "127.0.0.1:4000", 0);
        table.reserve("127.0.0.1:6000");

        assert_eq!(
            table.addresses(),
            vec!["127.0.0.1:4000".to_string(), "127.0.0.1:5000".to_string()]
        );
    }

    #[test]
    fn remove_returns_announced_version() {
        let table = PeerTable::new();
        connected(&table, "127.0.0.1:4000", 3);

        assert_eq!(table.remove("127.0.0.1:4000").unwrap().height, 3);
        assert!(table.remove("127.0.0.1:4000").is_none());
        assert!(table.can_connect_with("127.0.0.1:4000"));
    }

    #[test]
    fn concurrent_reservations_have_one_winner() {
        let table = Arc::new(PeerTable::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let table = table.clone();
                std::thread::spawn(move || table.reserve("127.0.0.1:4000"))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
