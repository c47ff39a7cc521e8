//! TCP implementation of [`Dialer`] and [`Peer`].
//!
//! A [`TcpPeer`] owns one outbound connection and issues strictly request/response exchanges
//! on it: one [`Request`] frame out, one [`Response`] frame back. The stream sits behind an
//! async mutex so concurrent callers cannot interleave frames. An exchange that fails or times
//! out leaves the stream at an unknown frame boundary, so the peer is closed for good.

use crate::core::transaction::Transaction;
use crate::network::codec;
use crate::network::message::{Ack, Request, Response, Version};
use crate::network::transport::{Dialer, NetworkError, Peer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

pub struct TcpDialer {
    dial_timeout: Duration,
    request_timeout: Duration,
}

impl TcpDialer {
    pub fn new(dial_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            dial_timeout,
            request_timeout,
        }
    }
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self::new(DEFAULT_DIAL_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }
}

#[async_trait::async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, addr: &str) -> Result<Arc<dyn Peer>, NetworkError> {
        let peer = TcpPeer::connect(addr, self.dial_timeout, self.request_timeout).await?;
        Ok(Arc::new(peer))
    }
}

pub struct TcpPeer {
    addr: String,
    stream: Mutex<TcpStream>,
    request_timeout: Duration,
    closed: AtomicBool,
}

impl TcpPeer {
    pub async fn connect(
        addr: &str,
        dial_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, NetworkError> {
        let stream = match timeout(dial_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(NetworkError::Dial {
                    addr: addr.to_string(),
                    source,
                });
            }
            Err(_) => return Err(NetworkError::Timeout(format!("dial to {addr}"))),
        };
        stream.set_nodelay(true)?;

        Ok(Self {
            addr: addr.to_string(),
            stream: Mutex::new(stream),
            request_timeout,
            closed: AtomicBool::new(false),
        })
    }

    /// Sends `request` and waits for the matching response.
    pub async fn request(&self, request: &Request) -> Result<Response, NetworkError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(NetworkError::Closed);
        }

        let exchange = async {
            let mut stream = self.stream.lock().await;
            codec::send(&mut *stream, request).await?;
            codec::recv::<_, Response>(&mut *stream)
                .await?
                .ok_or(NetworkError::Closed)
        };

        let result = match timeout(self.request_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(NetworkError::Timeout(format!("request to {}", self.addr))),
        };
        if result.is_err() {
            self.closed.store(true, Ordering::SeqCst);
        }
        result
    }
}

#[async_trait::async_trait]
impl Peer for TcpPeer {
    fn addr(&self) -> &str {
        &self.addr
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    async fn handshake(&self, ours: Version) -> Result<Version, NetworkError> {
        match self.request(&Request::Handshake(ours)).await? {
            Response::Version(theirs) => Ok(theirs),
            Response::Error(message) => Err(NetworkError::Remote(message)),
            other => Err(NetworkError::UnexpectedResponse(other.kind())),
        }
    }

    async fn send_transaction(&self, tx: Transaction) -> Result<Ack, NetworkError> {
        match self.request(&Request::Transaction(tx)).await? {
            Response::Ack(ack) => Ok(ack),
            Response::Error(message) => Err(NetworkError::Remote(message)),
            other => Err(NetworkError::UnexpectedResponse(other.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// An address nothing listens on.
    async fn closed_addr() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        addr
    }

    #[tokio::test]
    async fn dial_to_closed_port_fails() {
        let addr = closed_addr().await;
        let result = TcpDialer::default().dial(&addr).await;
        assert!(matches!(result, Err(NetworkError::Dial { addr: a, .. }) if a == addr));
    }

    #[tokio::test]
    async fn silent_remote_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        // Accept but never answer.
        let _server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let dialer = TcpDialer::new(DEFAULT_DIAL_TIMEOUT, Duration::from_millis(100));
        let peer = dialer.dial(&addr).await.unwrap();
        assert_eq!(peer.addr(), addr);

        let result = peer
            .handshake(Version {
                version: "0.0.1".into(),
                height: 0,
                listen_addr: "127.0.0.1:1".into(),
                peer_list: vec![],
            })
            .await;
        assert!(matches!(result, Err(NetworkError::Timeout(_))));
    }

    #[tokio::test]
    async fn remote_error_is_surfaced() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _: Option<Request> = codec::recv(&mut stream).await.unwrap();
            codec::send(&mut stream, &Response::Error("busy".into()))
                .await
                .unwrap();
        });

        let peer = TcpDialer::default().dial(&addr).await.unwrap();
        let tx = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![],
        };
        let result = peer.send_transaction(tx).await;
        assert!(matches!(result, Err(NetworkError::Remote(m)) if m == "busy"));
        // A well-formed error reply leaves the stream in sync.
        assert!(peer.is_open());
    }

    #[tokio::test]
    async fn late_reply_is_never_read_as_the_next_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            while let Some(request) = codec::recv::<_, Request>(&mut stream).await.unwrap() {
                let response = match request {
                    Request::Handshake(version) => {
                        tokio::time::sleep(Duration::from_millis(300)).await;
                        Response::Version(version)
                    }
                    Request::Transaction(_) => Response::Ack(Ack),
                };
                if codec::send(&mut stream, &response).await.is_err() {
                    return;
                }
            }
        });

        let dialer = TcpDialer::new(DEFAULT_DIAL_TIMEOUT, Duration::from_millis(100));
        let peer = dialer.dial(&addr).await.unwrap();
        let version = Version {
            version: "0.0.1".into(),
            height: 0,
            listen_addr: "127.0.0.1:1".into(),
            peer_list: vec![],
        };
        assert!(matches!(
            peer.handshake(version).await,
            Err(NetworkError::Timeout(_))
        ));
        assert!(!peer.is_open());

        tokio::time::sleep(Duration::from_millis(300)).await;
        let tx = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![],
        };
        assert!(matches!(
            peer.send_transaction(tx).await,
            Err(NetworkError::Closed)
        ));
    }
}
