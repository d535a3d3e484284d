//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Build components → Bind listener → Report URLs
//!
//! Shutdown (shutdown.rs):
//!     Request received → Stop accepting → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Request shutdown (a second one forces it)
//!
//! State (state.rs):
//!     Unbound → Listening → Draining → Closed
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listener
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has timeout: forced close after the grace period

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use shutdown::Shutdown;
pub use signals::Signals;
pub use startup::{hostname, reachable_urls, run, Lifecycle, LifecycleError, Listening};
pub use state::LifecycleState;
