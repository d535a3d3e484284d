//! The seam between the front server and the tunnel implementation.

use std::net::SocketAddr;

use async_trait::async_trait;
use axum::http::Request;
use bytes::Bytes;
use tokio::net::TcpStream;

/// Errors a tunnel backend may report. They are logged, never answered:
/// by the time a backend runs, the socket is no longer the server's.
#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    #[error("tunnel upstream {addr} unreachable: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out connecting to tunnel upstream {addr}")]
    ConnectTimeout { addr: SocketAddr },

    #[error("no tunnel backend available")]
    Unavailable,

    #[error("tunnel IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a backend receives for one upgrade request.
///
/// Ownership of `socket` is final: the front server keeps no handle to it.
#[derive(Debug)]
pub struct TunnelHandoff {
    /// Method, target, version and headers exactly as parsed.
    pub request: Request<()>,
    /// The request head bytes exactly as received.
    pub raw_head: Bytes,
    /// Bytes the client sent after the head, already read off the socket.
    pub head: Bytes,
    /// The raw client connection.
    pub socket: TcpStream,
    pub peer: SocketAddr,
}

/// A component that takes over upgraded connections.
///
/// Implementations own the protocol handshake and framing. The returned
/// future runs detached from request handling and may live as long as the
/// tunnel does.
#[async_trait]
pub trait TunnelBackend: Send + Sync + 'static {
    async fn route_request(&self, handoff: TunnelHandoff) -> Result<(), TunnelError>;
}

/// Backend used when no tunnel server is configured: closes every socket.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClosingBackend;

#[async_trait]
impl TunnelBackend for ClosingBackend {
    async fn route_request(&self, handoff: TunnelHandoff) -> Result<(), TunnelError> {
        drop(handoff.socket);
        Err(TunnelError::Unavailable)
    }
}
