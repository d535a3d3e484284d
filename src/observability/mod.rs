//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Request ID flows through the HTTP stack (see `http::request`)
//! - Metrics are cheap (atomic increments) and off unless configured

pub mod logging;
pub mod metrics;
