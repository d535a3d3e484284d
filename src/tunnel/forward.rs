//! Relay upgraded connections to an out-of-process tunnel server.
//!
//! The upstream sees the original request head byte-for-byte and performs
//! the protocol handshake itself; this side only moves bytes.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::tunnel::backend::{TunnelBackend, TunnelError, TunnelHandoff};

/// Forwards each handed-off connection to `upstream`.
#[derive(Debug, Clone)]
pub struct ForwardingBackend {
    upstream: SocketAddr,
    connect_timeout: Duration,
}

impl ForwardingBackend {
    pub fn new(upstream: SocketAddr, connect_timeout: Duration) -> Self {
        Self {
            upstream,
            connect_timeout,
        }
    }

    pub fn upstream(&self) -> SocketAddr {
        self.upstream
    }
}

#[async_trait]
impl TunnelBackend for ForwardingBackend {
    async fn route_request(&self, handoff: TunnelHandoff) -> Result<(), TunnelError> {
        let TunnelHandoff {
            raw_head,
            head,
            mut socket,
            peer,
            ..
        } = handoff;

        let mut upstream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(self.upstream))
            .await
            .map_err(|_| TunnelError::ConnectTimeout {
                addr: self.upstream,
            })?
            .map_err(|source| TunnelError::Connect {
                addr: self.upstream,
                source,
            })?;

        upstream.write_all(&raw_head).await?;
        if !head.is_empty() {
            upstream.write_all(&head).await?;
        }

        tracing::debug!(peer = %peer, upstream = %self.upstream, "Tunnel relay established");

        let (client_to_upstream, upstream_to_client) =
            tokio::io::copy_bidirectional(&mut socket, &mut upstream).await?;

        tracing::debug!(
            peer = %peer,
            sent = client_to_upstream,
            received = upstream_to_client,
            "Tunnel relay closed"
        );
        Ok(())
    }
}
