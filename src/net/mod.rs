//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (ID, lifetime tracking for drain)
//!     → classify.rs (read first request head: upgrade or HTTP?)
//!     → gate.rs (replay the head, vet every later head before hyper sees it)
//!     → Hand off to HTTP layer or tunnel router
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked for graceful shutdown until it leaves our hands
//! - Classification never writes to the socket
//! - Requests the classifier refuses never reach hyper, so hyper never answers on its own

pub mod classify;
pub mod connection;
pub mod gate;
pub mod listener;

pub use classify::{
    is_upgrade_request, parse_request_head, read_request_head, BodyFraming, ClassifyError, RequestHead,
    MAX_HEAD_SIZE,
};
pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{ConnectionPermit, Listener, ListenerError};
pub use gate::RequestGate;
