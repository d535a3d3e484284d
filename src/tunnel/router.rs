//! Upgrade request routing.
//!
//! # Responsibilities
//! - Accept upgrade requests only on the tunnel endpoint path
//! - Hand the raw socket and original request to the backend, detached
//! - Close everything else without writing a byte
//!
//! # Design Decisions
//! - Fail closed: no error page for other paths, so they stay invisible
//! - Never awaits the tunnel; its lifetime is the backend's business
//! - No retries

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;

use crate::net::RequestHead;
use crate::observability::metrics;
use crate::routing::ExactPathMatcher;
use crate::tunnel::backend::{TunnelBackend, TunnelHandoff};

/// What happened to an upgrade request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// Socket handed to the tunnel backend.
    Dispatched,
    /// Socket closed without a response.
    Refused,
}

impl UpgradeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradeOutcome::Dispatched => "dispatched",
            UpgradeOutcome::Refused => "refused",
        }
    }
}

/// Routes protocol-switch requests to the tunnel backend.
#[derive(Clone)]
pub struct UpgradeRouter {
    endpoint: ExactPathMatcher,
    backend: Arc<dyn TunnelBackend>,
}

impl UpgradeRouter {
    pub fn new(path: impl Into<String>, backend: Arc<dyn TunnelBackend>) -> Self {
        Self {
            endpoint: ExactPathMatcher::new(path),
            backend,
        }
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.path()
    }

    /// Route one upgrade request. Returns as soon as the socket has left
    /// this component, in either direction.
    pub fn route(&self, socket: TcpStream, peer: SocketAddr, head: RequestHead) -> UpgradeOutcome {
        if !self.endpoint.matches(head.path()) {
            tracing::debug!(peer = %peer, path = %head.path(), "Unroutable upgrade closed");
            drop(socket);
            metrics::record_upgrade(UpgradeOutcome::Refused.as_str());
            return UpgradeOutcome::Refused;
        }

        let (request, buffered, head_len) = head.into_parts();
        let handoff = TunnelHandoff {
            request,
            raw_head: buffered.slice(..head_len),
            head: buffered.slice(head_len..),
            socket,
            peer,
        };

        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            if let Err(e) = backend.route_request(handoff).await {
                tracing::debug!(peer = %peer, error = %e, "Tunnel backend dropped connection");
            }
        });

        tracing::debug!(peer = %peer, "Upgrade dispatched to tunnel backend");
        metrics::record_upgrade(UpgradeOutcome::Dispatched.as_str());
        UpgradeOutcome::Dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{read_request_head, MAX_HEAD_SIZE};
    use crate::tunnel::backend::TunnelError;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    struct Recorder(mpsc::UnboundedSender<TunnelHandoff>);

    #[async_trait]
    impl TunnelBackend for Recorder {
        async fn route_request(&self, handoff: TunnelHandoff) -> Result<(), TunnelError> {
            let _ = self.0.send(handoff);
            Ok(())
        }
    }

    /// Connect a client, send `request`, and return the server side + parsed head.
    async fn accepted(request: &'static [u8]) -> (TcpStream, TcpStream, SocketAddr, RequestHead) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(request).await.unwrap();
        let (mut server, peer) = listener.accept().await.unwrap();
        let head = read_request_head(&mut server, MAX_HEAD_SIZE).await.unwrap().unwrap();
        (client, server, peer, head)
    }

    #[tokio::test]
    async fn test_tunnel_path_dispatched_with_original_request() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = UpgradeRouter::new("/wisp/", Arc::new(Recorder(tx)));

        let (_client, server, peer, head) = accepted(
            b"GET /wisp/ HTTP/1.1\r\nHost: x\r\nConnection: Upgrade\r\nUpgrade: websocket\r\nX-Token: t1\r\n\r\n",
        )
        .await;

        assert_eq!(router.route(server, peer, head), UpgradeOutcome::Dispatched);

        let handoff = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(handoff.request.uri().path(), "/wisp/");
        assert_eq!(handoff.request.headers()["x-token"], "t1");
        assert!(handoff.raw_head.starts_with(b"GET /wisp/ HTTP/1.1\r\n"));
        assert!(handoff.head.is_empty());
    }

    #[tokio::test]
    async fn test_other_path_closed_silently() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = UpgradeRouter::new("/wisp/", Arc::new(Recorder(tx)));

        let (mut client, server, peer, head) = accepted(
            b"GET /other/ HTTP/1.1\r\nHost: x\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\r\n",
        )
        .await;

        assert_eq!(router.route(server, peer, head), UpgradeOutcome::Refused);

        let mut buf = Vec::new();
        let read = client.read_to_end(&mut buf).await;
        assert!(buf.is_empty());
        assert!(read.is_ok() || read.unwrap_err().kind() == std::io::ErrorKind::ConnectionReset);
        assert!(rx.try_recv().is_err());
    }
}
