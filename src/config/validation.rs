//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics and reports every
//! problem at once rather than stopping at the first.

use std::collections::HashSet;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ServerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("mount prefix {0:?} must start with '/'")]
    RelativeMountPrefix(String),

    #[error("mount prefix {0:?} is registered more than once")]
    DuplicateMountPrefix(String),

    #[error("mount {prefix:?} has an empty root directory")]
    EmptyMountRoot { prefix: String },

    #[error("mount {prefix:?} has an invalid index file name {index_file:?}")]
    InvalidIndexFile { prefix: String, index_file: String },

    #[error("tunnel.path {0:?} must start with '/' and contain no query")]
    InvalidTunnelPath(String),

    #[error("tunnel.upstream {0:?} is not a socket address")]
    InvalidTunnelUpstream(String),

    #[error("embed origin {0:?} is not an http(s) origin or 'self'")]
    InvalidEmbedOrigin(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    let mut seen = HashSet::new();
    for mount in &config.mounts {
        if !mount.prefix.starts_with('/') {
            errors.push(ValidationError::RelativeMountPrefix(mount.prefix.clone()));
        }
        // "/uv" and "/uv/" name the same mount.
        let key = mount.prefix.trim_end_matches('/');
        if !seen.insert(key.to_string()) {
            errors.push(ValidationError::DuplicateMountPrefix(mount.prefix.clone()));
        }
        if mount.root.trim().is_empty() {
            errors.push(ValidationError::EmptyMountRoot {
                prefix: mount.prefix.clone(),
            });
        }
        if mount.index_file.is_empty()
            || mount.index_file.contains(['/', '\\'])
            || mount.index_file == ".."
        {
            errors.push(ValidationError::InvalidIndexFile {
                prefix: mount.prefix.clone(),
                index_file: mount.index_file.clone(),
            });
        }
    }

    let tunnel_path = &config.tunnel.path;
    if !tunnel_path.starts_with('/') || tunnel_path.contains(['?', '#']) {
        errors.push(ValidationError::InvalidTunnelPath(tunnel_path.clone()));
    }

    if let Some(upstream) = &config.tunnel.upstream {
        if upstream.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidTunnelUpstream(upstream.clone()));
        }
    }

    for origin in &config.policy.allowed_embed_origins {
        if !is_embed_origin(origin) {
            errors.push(ValidationError::InvalidEmbedOrigin(origin.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// An origin usable as a `frame-ancestors` source: `'self'`, or a bare
/// http(s) scheme + host (+ port) with no path, query or fragment.
fn is_embed_origin(origin: &str) -> bool {
    if origin == "'self'" {
        return true;
    }
    if origin.is_empty() || origin.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    if origin.contains([';', ',']) {
        return false;
    }

    match Url::parse(origin) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some()
                && url.username().is_empty()
                && url.password().is_none()
                && url.query().is_none()
                && url.fragment().is_none()
                // Url normalizes an empty path to "/", so reject anything longer
                // and any literal trailing slash the user wrote.
                && url.path() == "/"
                && !origin.ends_with('/')
        }
        Err(_) => false,
    }
}
