//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Pick human or JSON output
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - JSON format for production, pretty format for development

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(
    config: &ObservabilityConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(&config.log_level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
}

fn default_directives(level: &str) -> String {
    format!("proxy_front={level},tower_http={level}", level = level)
}
