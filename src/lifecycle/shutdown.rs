//! Shutdown coordination for the front server.

use tokio::sync::watch;

/// Coordinator for graceful shutdown.
///
/// Counts shutdown requests: the first asks for a graceful drain, the
/// second forces the close. Late subscribers still see earlier requests.
#[derive(Debug, Clone)]
pub struct Shutdown {
    requests: watch::Sender<u32>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (requests, _) = watch::channel(0);
        Self { requests }
    }

    /// Record a shutdown request (a signal, or a test asking to stop).
    pub fn trigger(&self) {
        self.requests.send_modify(|n| *n = n.saturating_add(1));
    }

    /// Number of requests seen so far.
    pub fn request_count(&self) -> u32 {
        *self.requests.borrow()
    }

    /// Resolves once the first shutdown request arrives.
    pub async fn requested(&self) {
        self.wait_for_count(1).await;
    }

    /// Resolves once a second shutdown request arrives.
    pub async fn forced(&self) {
        self.wait_for_count(2).await;
    }

    async fn wait_for_count(&self, count: u32) {
        let mut rx = self.requests.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n >= count).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
