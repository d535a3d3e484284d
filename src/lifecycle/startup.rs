//! Startup orchestration.
//!
//! # Responsibilities
//! - Build every component from the validated configuration
//! - Bind the listener and report where the server is reachable
//! - Run until shutdown is requested, then drain within the grace period
//!
//! # Design Decisions
//! - Fail fast: a bind failure is fatal, no other port is tried
//! - No globals: everything is built here and owned by `Lifecycle`
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::config::ServerConfig;
use crate::http::{DrainOutcome, FrontServer, ServerError};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::Signals;
use crate::lifecycle::state::LifecycleState;
use crate::net::{Listener, ListenerError};
use crate::tunnel::{self, TunnelBackend};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Bind(#[from] ListenerError),

    #[error("failed to read bound address: {0}")]
    LocalAddr(#[source] std::io::Error),

    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),
}

/// A fully built server that has not bound its socket yet.
pub struct Lifecycle {
    config: ServerConfig,
    server: FrontServer,
    state: watch::Sender<LifecycleState>,
}

impl Lifecycle {
    pub fn new(config: ServerConfig, backend: Arc<dyn TunnelBackend>) -> Result<Self, LifecycleError> {
        let server = FrontServer::new(&config, backend)?;
        let (state, _) = watch::channel(LifecycleState::Unbound);
        Ok(Self { config, server, state })
    }

    /// Observe state transitions.
    pub fn state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Unbound → Listening.
    pub async fn bind(self) -> Result<Listening, LifecycleError> {
        let listener = Listener::bind(&self.config.listener).await?;
        let local_addr = listener.local_addr().map_err(LifecycleError::LocalAddr)?;
        self.state.send_replace(LifecycleState::Listening);

        Ok(Listening {
            server: self.server,
            listener,
            local_addr,
            grace: Duration::from_secs(self.config.shutdown.grace_period_secs),
            state: self.state,
        })
    }
}

/// A bound server, ready to accept.
pub struct Listening {
    server: FrontServer,
    listener: Listener,
    local_addr: SocketAddr,
    grace: Duration,
    state: watch::Sender<LifecycleState>,
}

impl Listening {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// URL forms the server can be reached at.
    pub fn reachable_urls(&self) -> Vec<String> {
        reachable_urls(&hostname(), self.local_addr)
    }

    /// Log the reachable URLs.
    pub fn report(&self) {
        for url in self.reachable_urls() {
            tracing::info!(url = %url, "Listening on");
        }
        tracing::info!(path = %self.server.tunnel_path(), "Tunnel endpoint ready");
    }

    /// Accept until `shutdown` is requested, then drain.
    ///
    /// Draining ends when every HTTP connection has finished, the grace
    /// period elapses, or shutdown is requested a second time.
    pub async fn run_until(self, shutdown: &Shutdown) -> DrainOutcome {
        self.server.serve(self.listener, shutdown.requested()).await;

        self.state.send_replace(LifecycleState::Draining);
        let outcome = self.server.drain(self.grace, shutdown.forced()).await;
        self.state.send_replace(LifecycleState::Closed);

        match outcome {
            DrainOutcome::Drained => tracing::info!("HTTP server closed"),
            DrainOutcome::GraceElapsed { remaining } => tracing::warn!(
                remaining_connections = remaining,
                grace_secs = self.grace.as_secs(),
                "Grace period elapsed, closing remaining connections"
            ),
            DrainOutcome::Forced { remaining } => tracing::warn!(
                remaining_connections = remaining,
                "Shutdown forced, closing remaining connections"
            ),
        }
        outcome
    }
}

/// Build, bind and run the server until SIGINT/SIGTERM.
pub async fn run(config: ServerConfig) -> Result<DrainOutcome, LifecycleError> {
    let shutdown = Shutdown::new();
    Signals::install()
        .map_err(LifecycleError::Signals)?
        .forward_to(shutdown.clone());

    let backend = tunnel::backend_from_config(&config.tunnel);
    let listening = Lifecycle::new(config, backend)?.bind().await?;
    listening.report();

    Ok(listening.run_until(&shutdown).await)
}

/// `localhost`, the machine name, and the literal bound address.
pub fn reachable_urls(hostname: &str, addr: SocketAddr) -> Vec<String> {
    let port = addr.port();
    vec![
        format!("http://localhost:{}", port),
        format!("http://{}:{}", hostname, port),
        format!("http://{}", addr),
    ]
}

/// Best-effort machine name.
pub fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/proc/sys/kernel/hostname").ok())
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ListenerConfig;
    use crate::tunnel::ClosingBackend;

    fn local_config() -> ServerConfig {
        ServerConfig {
            listener: ListenerConfig {
                host: "127.0.0.1".into(),
                port: 0,
                max_connections: 16,
            },
            mounts: Vec::new(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_reachable_urls_ipv4() {
        let urls = reachable_urls("box", "0.0.0.0:8080".parse().unwrap());
        assert_eq!(
            urls,
            vec!["http://localhost:8080", "http://box:8080", "http://0.0.0.0:8080"]
        );
    }

    #[test]
    fn test_reachable_urls_ipv6_bracketed() {
        let urls = reachable_urls("box", "[::]:9000".parse().unwrap());
        assert_eq!(urls[2], "http://[::]:9000");
    }

    #[test]
    fn test_hostname_never_empty() {
        assert!(!hostname().is_empty());
    }

    #[tokio::test]
    async fn test_states_progress_through_shutdown() {
        let lifecycle = Lifecycle::new(local_config(), Arc::new(ClosingBackend)).unwrap();
        let state = lifecycle.state();
        assert_eq!(*state.borrow(), LifecycleState::Unbound);

        let listening = lifecycle.bind().await.unwrap();
        assert_eq!(*state.borrow(), LifecycleState::Listening);
        assert_ne!(listening.local_addr().port(), 0);

        let shutdown = Shutdown::new();
        shutdown.trigger();
        let outcome = listening.run_until(&shutdown).await;

        assert_eq!(outcome, DrainOutcome::Drained);
        assert_eq!(*state.borrow(), LifecycleState::Closed);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_fatal() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = local_config();
        config.listener.port = taken.local_addr().unwrap().port();

        let lifecycle = Lifecycle::new(config, Arc::new(ClosingBackend)).unwrap();
        assert!(matches!(
            lifecycle.bind().await.err().unwrap(),
            LifecycleError::Bind(ListenerError::Bind { .. })
        ));
    }
}
