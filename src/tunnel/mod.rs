//! Tunnel handoff subsystem.
//!
//! # Data Flow
//! ```text
//! Classified upgrade request (raw socket + parsed head)
//!     → router.rs (exact tunnel path? otherwise close)
//!     → backend.rs (TunnelBackend trait, detached task)
//!         → forward.rs (relay to an external tunnel server), or
//!         → ClosingBackend (nothing configured)
//! ```
//!
//! # Design Decisions
//! - The trait is the only contact point with the tunnel implementation
//! - Socket ownership moves with the handoff; nothing is kept behind

pub mod backend;
pub mod forward;
pub mod router;

pub use backend::{ClosingBackend, TunnelBackend, TunnelError, TunnelHandoff};
pub use forward::ForwardingBackend;
pub use router::{UpgradeOutcome, UpgradeRouter};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::TunnelConfig;

/// Pick the backend named by the configuration.
///
/// `upstream` must have passed validation; an unparsable value falls back
/// to closing.
pub fn backend_from_config(config: &TunnelConfig) -> Arc<dyn TunnelBackend> {
    match config.upstream.as_deref().map(str::parse::<SocketAddr>) {
        Some(Ok(addr)) => {
            tracing::info!(upstream = %addr, path = %config.path, "Tunnel upgrades forwarded");
            Arc::new(ForwardingBackend::new(
                addr,
                Duration::from_secs(config.connect_timeout_secs),
            ))
        }
        Some(Err(e)) => {
            tracing::error!(error = %e, "Invalid tunnel upstream; tunnel upgrades will be closed");
            Arc::new(ClosingBackend)
        }
        None => {
            tracing::warn!(path = %config.path, "No tunnel upstream configured; tunnel upgrades will be closed");
            Arc::new(ClosingBackend)
        }
    }
}
