//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Bind to the configured host and port
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore
//! - Graceful handling of accept errors

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {addr}: {source}")]
    Bind { addr: String, source: std::io::Error },
    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(#[source] std::io::Error),
    /// The connection limiter was closed.
    #[error("Connection limiter closed")]
    Closed,
}

/// A bounded TCP listener that limits concurrent connections.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections will wait until a slot becomes available.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Semaphore to limit concurrent connections.
    connection_limit: Arc<Semaphore>,
    /// Configured maximum connections.
    max_connections: usize,
}

impl Listener {
    /// Bind to the configured address with connection limits.
    ///
    /// An occupied port is an error; another port is never tried.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr = format_bind_addr(&config.host, config.port);

        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|source| ListenerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::Bind { addr, source })?;

        tracing::info!(
            address = %local_addr,
            max_connections = config.max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(config.max_connections)),
            max_connections: config.max_connections,
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// This will wait if the connection limit has been reached.
    /// Returns the stream and a permit that must be held for the connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        // Acquire permit first (backpressure)
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        // Then accept the connection
        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Get current available connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    /// Get configured maximum connections.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

fn format_bind_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the connection slot is released back to the pool.
/// This ensures backpressure is maintained even if the connection handler panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
