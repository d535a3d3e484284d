//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Translate each delivery into a shutdown request
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are installed before the listener binds, so an early signal
//!   is never lost to the default disposition
//! - A second SIGTERM/SIGINT forces shutdown

use crate::lifecycle::shutdown::Shutdown;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Installed termination signal handlers.
pub struct Signals {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
}

impl Signals {
    /// Install handlers for SIGINT and SIGTERM.
    #[cfg(unix)]
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next termination signal and return its name.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "ctrl-c",
            Err(_) => std::future::pending().await,
        }
    }

    /// Forward every signal to `shutdown` for the life of the process.
    pub fn forward_to(mut self, shutdown: Shutdown) {
        tokio::spawn(async move {
            loop {
                let name = self.recv().await;
                if shutdown.request_count() == 0 {
                    tracing::info!(signal = name, "Signal received, closing HTTP server");
                } else {
                    tracing::warn!(signal = name, "Second signal received, forcing shutdown");
                }
                shutdown.trigger();
            }
        });
    }
}
