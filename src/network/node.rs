//! Gossip node: serves handshakes and transactions and discovers peers transitively.
//!
//! Discovery works on a queue of candidate listen addresses. Every address is dialed at most
//! once per bootstrap run, only after it was reserved in the [`PeerTable`], and by at most
//! `max_dial_workers` concurrent tasks. Each handshake reply adds the remote's unknown peers
//! to the queue, so a chain of bootstrap lists converges to a full mesh.

use crate::core::ledger::ChainReader;
use crate::core::transaction::Transaction;
use crate::network::message::{Ack, Version};
use crate::network::peer_table::PeerTable;
use crate::network::server::{NodeService, serve};
use crate::network::tcp_transport::{DEFAULT_DIAL_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, TcpDialer};
use crate::network::transport::{Dialer, NetworkError, Peer};
use crate::network::txpool::TxPool;
use crate::utils::log::Logger;
use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

/// Configuration options for a node.
#[derive(Debug, Clone)]
pub struct NodeOpts {
    /// Protocol version announced in handshakes.
    pub version: String,
    /// Address to bind. Port 0 picks a free port; the bound address is what gets announced.
    pub listen_addr: String,
    /// Peers dialed right after the listener is up.
    pub bootstrap: Vec<String>,
    /// Upper bound on concurrent dials during one bootstrap run.
    pub max_dial_workers: usize,
    pub dial_timeout: Duration,
    pub request_timeout: Duration,
    /// Falls back to the pool's default when `None`.
    pub txpool_capacity: Option<usize>,
}

impl Default for NodeOpts {
    fn default() -> Self {
        Self {
            version: "0.0.1".to_string(),
            listen_addr: "127.0.0.1:3000".to_string(),
            bootstrap: Vec::new(),
            max_dial_workers: 8,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            txpool_capacity: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Unstarted,
    Listening,
    /// Listening, with at least one bootstrap run in progress.
    Bootstrapping,
}

struct NodeInner {
    opts: NodeOpts,
    chain: Arc<dyn ChainReader>,
    dialer: Arc<dyn Dialer>,
    logger: Logger,
    peers: PeerTable,
    txpool: TxPool,
    listen_addr: OnceLock<String>,
    listening: AtomicBool,
    bootstraps: AtomicUsize,
}

/// Cheaply cloneable handle to a running node.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

/// Counts a bootstrap run for as long as it lives.
struct BootstrapRun<'a>(&'a AtomicUsize);

impl<'a> BootstrapRun<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for BootstrapRun<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Node {
    pub fn new(
        opts: NodeOpts,
        chain: Arc<dyn ChainReader>,
        dialer: Arc<dyn Dialer>,
        logger: Logger,
    ) -> Self {
        let txpool = TxPool::new(opts.txpool_capacity);
        Self {
            inner: Arc::new(NodeInner {
                opts,
                chain,
                dialer,
                logger,
                peers: PeerTable::new(),
                txpool,
                listen_addr: OnceLock::new(),
                listening: AtomicBool::new(false),
                bootstraps: AtomicUsize::new(0),
            }),
        }
    }

    /// Node that dials peers over TCP with the configured timeouts.
    pub fn with_tcp(opts: NodeOpts, chain: Arc<dyn ChainReader>, logger: Logger) -> Self {
        let dialer = Arc::new(TcpDialer::new(opts.dial_timeout, opts.request_timeout));
        Self::new(opts, chain, dialer, logger)
    }

    /// Binds the listener, starts serving and kicks off bootstrapping of the configured peers.
    ///
    /// Returns the bound address. A node can only be started once.
    pub async fn start(&self) -> Result<SocketAddr, NetworkError> {
        if self.inner.listening.swap(true, Ordering::SeqCst) {
            return Err(NetworkError::AlreadyStarted);
        }

        let listener = match TcpListener::bind(&self.inner.opts.listen_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.inner.listening.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };
        let local = listener.local_addr()?;
        let listen_addr = local.to_string();
        let _ = self.inner.listen_addr.set(listen_addr.clone());
        self.inner.peers.set_self_addr(listen_addr.clone());

        self.inner.logger.info(format!(
            "listening on {listen_addr} (version {})",
            self.inner.opts.version
        ));
        tokio::spawn(serve(listener, Arc::new(self.clone())));

        if !self.inner.opts.bootstrap.is_empty() {
            let node = self.clone();
            let addrs = self.inner.opts.bootstrap.clone();
            tokio::spawn(async move { node.bootstrap(addrs).await });
        }

        Ok(local)
    }

    /// Dials `addrs` and every peer learned from them, returning once the queue is drained.
    ///
    /// Failed dials are logged and skipped.
    pub async fn bootstrap(&self, addrs: Vec<String>) {
        let _run = BootstrapRun::enter(&self.inner.bootstraps);
        let workers = self.inner.opts.max_dial_workers.max(1);

        let mut queue: VecDeque<String> = addrs.into();
        let mut visited = HashSet::new();
        let mut tasks = JoinSet::new();

        loop {
            while tasks.len() < workers {
                let Some(addr) = queue.pop_front() else {
                    break;
                };
                if !visited.insert(addr.clone()) || !self.inner.peers.reserve(&addr) {
                    continue;
                }

                let node = self.clone();
                tasks.spawn(async move { node.dial_peer(addr).await });
            }

            match tasks.join_next().await {
                Some(Ok(learned)) => queue.extend(learned),
                Some(Err(e)) => self.inner.logger.error(format!("dial task failed: {e}")),
                None => break,
            }
        }
    }

    /// Dials one reserved address. Returns the unknown peers it announced.
    async fn dial_peer(&self, addr: String) -> Vec<String> {
        match self.connect(&addr).await {
            Ok(version) => version
                .peer_list
                .into_iter()
                .filter(|a| self.inner.peers.can_connect_with(a))
                .collect(),
            Err(e) => {
                self.inner.logger.warn(format!("failed to connect to {addr}: {e}"));
                self.inner.peers.release(&addr);
                Vec::new()
            }
        }
    }

    async fn connect(&self, addr: &str) -> Result<Version, NetworkError> {
        let peer = self.inner.dialer.dial(addr).await?;
        let theirs = peer.handshake(self.version()).await?;

        // The remote may announce a different address than the one we dialed.
        if theirs.listen_addr != addr {
            self.inner.peers.release(addr);
        }
        if !self.inner.peers.register(peer, theirs.clone()) {
            return Err(NetworkError::SelfConnection(theirs.listen_addr));
        }

        self.inner.logger.info(format!(
            "connected to {} (height {})",
            theirs.listen_addr, theirs.height
        ));
        Ok(theirs)
    }

    /// Opens a connection back to an inbound peer. `None` when a dial to `addr` is already
    /// reserved by someone else.
    async fn dial_back(&self, addr: &str) -> Result<Option<Arc<dyn Peer>>, NetworkError> {
        if !self.inner.peers.reserve(addr) {
            return Ok(None);
        }

        match self.inner.dialer.dial(addr).await {
            Ok(peer) => Ok(Some(peer)),
            Err(e) => {
                self.inner.peers.release(addr);
                Err(e)
            }
        }
    }

    /// Our current version: chain height, listen address and connected peers.
    pub fn version(&self) -> Version {
        Version {
            version: self.inner.opts.version.clone(),
            height: self.inner.chain.height(),
            listen_addr: self.listen_addr().to_string(),
            peer_list: self.inner.peers.addresses(),
        }
    }

    /// Bound address once started, the configured one before.
    pub fn listen_addr(&self) -> &str {
        self.inner
            .listen_addr
            .get()
            .map(String::as_str)
            .unwrap_or(&self.inner.opts.listen_addr)
    }

    pub fn status(&self) -> NodeStatus {
        if !self.inner.listening.load(Ordering::SeqCst) {
            NodeStatus::Unstarted
        } else if self.inner.bootstraps.load(Ordering::SeqCst) > 0 {
            NodeStatus::Bootstrapping
        } else {
            NodeStatus::Listening
        }
    }

    /// Listen addresses of connected peers, sorted.
    pub fn peers(&self) -> Vec<String> {
        self.inner.peers.addresses()
    }

    /// Number of connected peers.
    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }

    pub fn peer(&self, addr: &str) -> Option<Arc<dyn Peer>> {
        self.inner.peers.get(addr)
    }

    pub fn txpool(&self) -> &TxPool {
        &self.inner.txpool
    }

    /// Forgets a connected peer. Returns whether it was known.
    pub fn disconnect(&self, addr: &str) -> bool {
        let removed = self.inner.peers.remove(addr).is_some();
        if removed {
            self.inner.logger.info(format!("disconnected from {addr}"));
        }
        removed
    }
}

#[async_trait::async_trait]
impl NodeService for Node {
    async fn handshake(&self, remote: Version) -> Result<Version, NetworkError> {
        let addr = remote.listen_addr.clone();
        if addr == self.listen_addr() {
            return Err(NetworkError::SelfConnection(addr));
        }

        let peer = match self.inner.peers.get(&addr) {
            Some(peer) if peer.is_open() => Some(peer),
            Some(_) => {
                self.inner.peers.remove(&addr);
                self.dial_back(&addr).await?
            }
            None => self.dial_back(&addr).await?,
        };

        let unknown: Vec<String> = remote
            .peer_list
            .iter()
            .filter(|a| **a != addr && self.inner.peers.can_connect_with(a))
            .cloned()
            .collect();

        let height = remote.height;
        match peer {
            Some(peer) => {
                self.inner.peers.register(peer, remote);
            }
            // Our own in-flight dial registers it once its handshake returns.
            None => self
                .inner
                .logger
                .debug(format!("dial to {addr} already in flight")),
        }
        self.inner
            .logger
            .info(format!("handshake from {addr} (height {height})"));

        if !unknown.is_empty() {
            let node = self.clone();
            tokio::spawn(async move { node.bootstrap(unknown).await });
        }

        Ok(self.version())
    }

    async fn handle_transaction(&self, from: SocketAddr, tx: Transaction) -> Ack {
        let logger = &self.inner.logger;
        logger.info(format!("Received transaction from: {from}"));

        let hash = tx.hash();
        if !tx.verify() {
            logger.warn(format!("dropping transaction {hash} with an invalid signature"));
        } else if !self.inner.txpool.append(tx) {
            logger.warn(format!("transaction {hash} is already pooled or the pool is full"));
        } else {
            logger.debug(format!("pooled transaction {hash}"));
        }

        Ack
    }
}
