//! Front server for a browser-based web proxy.
//!
//! Serves the client bundles from static mounts, stamps every HTTP response
//! with the embedding and cross-origin isolation headers, and hands upgrade
//! requests on the tunnel path to a pluggable tunnel backend.

// Core subsystems
pub mod assets;
pub mod config;
pub mod http;
pub mod net;
pub mod routing;
pub mod tunnel;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::ServerConfig;
pub use http::FrontServer;
pub use lifecycle::{Lifecycle, Shutdown};
pub use tunnel::{TunnelBackend, TunnelHandoff};
