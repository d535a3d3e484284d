//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP request path
//!     → router.rs (mount lookup, longest prefix)
//!     → matcher.rs (segment-aware prefix match)
//!     → Return: matched mount + remainder, or NoMatch (404)
//!
//! Upgrade request target
//!     → matcher.rs (exact tunnel path match)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use matcher::{ExactPathMatcher, PathPrefixMatcher};
pub use router::{PrefixRouter, RouteMatch};
