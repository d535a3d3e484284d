//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (from net::Listener)
//!     → server.rs (classify first request)
//!         → upgrade: tunnel::UpgradeRouter
//!         → HTTP: hyper HTTP/1.1 over the replayed bytes
//!     → request.rs (request ID, set and propagated)
//!     → assets::serve_asset (fallback handler)
//!     → security::enforce_policy (outermost, every response)
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{DrainOutcome, FrontServer, ServerError};
