//! Static asset subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP request (GET/HEAD)
//!     → service.rs (mount lookup via routing::PrefixRouter)
//!     → mount.rs (index / listing / redirect decisions)
//!     → resolve.rs (decode, normalize, confine to root)
//!     → tower_http::services::ServeFile (streamed body)
//! ```
//!
//! # Design Decisions
//! - Asset trees are opaque; nothing here knows what the bundles contain
//! - Escaping the root is a 403, a missing file a 404, an IO failure a 500
//! - Files are streamed, never read whole into memory

pub mod error;
pub mod listing;
pub mod mount;
pub mod resolve;
pub mod service;

pub use error::AssetError;
pub use mount::{AssetMount, Resolved};
pub use service::{serve_asset, AssetState};
