//! Inbound side of the protocol.
//!
//! [`serve`] accepts TCP connections and runs each one on its own task, reading [`Request`]
//! frames and answering every one of them with a [`Response`] produced by a [`NodeService`].

use crate::core::transaction::Transaction;
use crate::network::codec;
use crate::network::message::{Ack, Request, Response, Version};
use crate::network::transport::NetworkError;
use crate::types::encoding::Decode;
use crate::warn;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

/// Handlers for the two RPCs a node serves.
#[async_trait::async_trait]
pub trait NodeService: Send + Sync {
    /// Registers the remote node and returns our own version.
    async fn handshake(&self, remote: Version) -> Result<Version, NetworkError>;

    async fn handle_transaction(&self, from: SocketAddr, tx: Transaction) -> Ack;
}

/// Accept loop. Runs until the listener fails.
pub async fn serve(listener: TcpListener, service: Arc<dyn NodeService>) {
    loop {
        match listener.accept().await {
            Ok((stream, from)) => {
                let service = service.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, from, service).await {
                        warn!("connection from {from} closed: {e}");
                    }
                });
            }
            Err(e) => {
                warn!("failed to accept connection: {e}");
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    from: SocketAddr,
    service: Arc<dyn NodeService>,
) -> Result<(), NetworkError> {
    stream.set_nodelay(true)?;

    while let Some(payload) = codec::read_frame(&mut stream).await? {
        let response = match Request::from_bytes(&payload) {
            Ok(request) => dispatch(request, from, service.as_ref()).await,
            Err(e) => Response::Error(format!("malformed request: {e}")),
        };
        codec::send(&mut stream, &response).await?;
    }
    Ok(())
}

async fn dispatch(request: Request, from: SocketAddr, service: &dyn NodeService) -> Response {
    match request {
        Request::Handshake(version) => match service.handshake(version).await {
            Ok(ours) => Response::Version(ours),
            Err(e) => Response::Error(e.to_string()),
        },
        Request::Transaction(tx) => Response::Ack(service.handle_transaction(from, tx).await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::tcp_transport::TcpDialer;
    use crate::network::transport::Dialer;
    use std::sync::Mutex;

    /// Echoes handshakes back and records transaction senders.
    #[derive(Default)]
    struct Echo {
        senders: Mutex<Vec<SocketAddr>>,
    }

    #[async_trait::async_trait]
    impl NodeService for Echo {
        async fn handshake(&self, remote: Version) -> Result<Version, NetworkError> {
            if remote.listen_addr.is_empty() {
                return Err(NetworkError::SelfConnection(remote.listen_addr));
            }
            Ok(Version {
                height: remote.height + 1,
                ..remote
            })
        }

        async fn handle_transaction(&self, from: SocketAddr, _tx: Transaction) -> Ack {
            self.senders.lock().unwrap().push(from);
            Ack
        }
    }

    async fn start_echo() -> (String, Arc<Echo>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let echo = Arc::new(Echo::default());
        tokio::spawn(serve(listener, echo.clone()));
        (addr, echo)
    }

    fn version(listen_addr: &str) -> Version {
        Version {
            version: "0.0.1".into(),
            height: 1,
            listen_addr: listen_addr.into(),
            peer_list: vec![],
        }
    }

    #[tokio::test]
    async fn requests_on_one_connection_are_answered_in_order() {
        let (addr, echo) = start_echo().await;
        let peer = TcpDialer::default().dial(&addr).await.unwrap();

        let reply = peer.handshake(version("127.0.0.1:9")).await.unwrap();
        assert_eq!(reply.height, 2);

        let tx = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![],
        };
        assert_eq!(peer.send_transaction(tx).await.unwrap(), Ack);
        assert_eq!(echo.senders.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn service_errors_become_error_responses() {
        let (addr, _) = start_echo().await;
        let peer = TcpDialer::default().dial(&addr).await.unwrap();

        let result = peer.handshake(version("")).await;
        assert!(matches!(result, Err(NetworkError::Remote(_))));

        // The connection stays usable.
        assert!(peer.handshake(version("127.0.0.1:9")).await.is_ok());
    }

    #[tokio::test]
    async fn malformed_request_keeps_connection_open() {
        let (addr, _) = start_echo().await;
        let mut stream = TcpStream::connect(&addr).await.unwrap();

        codec::write_frame(&mut stream, &[9, 9, 9]).await.unwrap();
        let response: Option<Response> = codec::recv(&mut stream).await.unwrap();
        assert!(matches!(response, Some(Response::Error(_))));

        codec::send(&mut stream, &Request::Handshake(version("127.0.0.1:9")))
            .await
            .unwrap();
        let response: Option<Response> = codec::recv(&mut stream).await.unwrap();
        assert!(matches!(response, Some(Response::Version(_))));
    }
}
