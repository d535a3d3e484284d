//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing HTTP response (any status)
//!     → headers.rs (embedding + isolation headers, applied last)
//!     → wire
//! ```
//!
//! Path traversal protection lives with the asset resolver
//! (`assets::resolve`), where the filesystem root is known.
//!
//! # Design Decisions
//! - Fail closed: unroutable upgrades and escaping paths are refused
//! - Policy is not conditional on response status

pub mod headers;

pub use headers::{enforce_policy, HeaderPolicy, InvalidOrigin};
