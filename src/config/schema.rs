//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the front
//! server. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Port used when neither the config file nor `PORT` supplies a usable one.
pub const DEFAULT_PORT: u16 = 8080;

/// Root configuration for the front server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind host/port, connection limit).
    pub listener: ListenerConfig,

    /// Embedding / isolation header policy.
    pub policy: PolicyConfig,

    /// Tunnel endpoint and backend settings.
    pub tunnel: TunnelConfig,

    /// Static asset mounts, in registration order.
    pub mounts: Vec<MountConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Shutdown behaviour.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            policy: PolicyConfig::default(),
            tunnel: TunnelConfig::default(),
            mounts: default_mounts(),
            timeouts: TimeoutConfig::default(),
            shutdown: ShutdownConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// The asset trees the proxy client expects: the UI at the root plus the
/// rewriter, transport and multiplexer bundles.
fn default_mounts() -> Vec<MountConfig> {
    vec![
        MountConfig::new("/", "assets/public"),
        MountConfig::new("/uv/", "assets/uv"),
        MountConfig::new("/epoxy/", "assets/epoxy"),
        MountConfig::new("/baremux/", "assets/baremux"),
    ]
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0" or "::").
    pub host: String,

    /// Port to bind; 0 lets the OS choose.
    pub port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_connections: 10_000,
        }
    }
}

/// Which origins may frame the served pages.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Ordered allow-list of embedding origins. Empty denies framing.
    pub allowed_embed_origins: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allowed_embed_origins: vec!["https://sites.google.com".to_string()],
        }
    }
}

/// Tunnel endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// Exact request path that accepts protocol-switch requests.
    pub path: String,

    /// Address of an out-of-process tunnel server (e.g., "127.0.0.1:6001").
    /// When unset, handed-off connections are closed.
    pub upstream: Option<String>,

    /// Upstream connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            path: "/wisp/".to_string(),
            upstream: None,
            connect_timeout_secs: 5,
        }
    }
}

/// A static asset mount: URL prefix → directory tree.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MountConfig {
    /// URL path prefix (e.g., "/uv/").
    pub prefix: String,

    /// Directory served under the prefix.
    pub root: String,

    /// Serve the index file when a directory is requested.
    #[serde(default = "default_true")]
    pub index: bool,

    /// Index file name looked up inside directories.
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// Render a listing for directories without an index file.
    #[serde(default)]
    pub listing: bool,
}

impl MountConfig {
    /// Mount `root` under `prefix` with index serving on and listings off.
    pub fn new(prefix: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            root: root.into(),
            index: true,
            index_file: default_index_file(),
            listing: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_index_file() -> String {
    "index.html".to_string()
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed for a client to send a complete request head, in seconds.
    pub header_read_secs: u64,

    /// Time allowed to produce response headers, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            header_read_secs: 10,
            request_secs: 30,
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long in-flight HTTP connections may take to finish, in seconds.
    pub grace_period_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_mirror_proxy_layout() {
        let config = ServerConfig::default();
        assert_eq!(config.listener.host, "0.0.0.0");
        assert_eq!(config.listener.port, DEFAULT_PORT);
        assert_eq!(config.tunnel.path, "/wisp/");
        assert_eq!(
            config.policy.allowed_embed_origins,
            vec!["https://sites.google.com".to_string()]
        );

        let prefixes: Vec<_> = config.mounts.iter().map(|m| m.prefix.as_str()).collect();
        assert_eq!(prefixes, ["/", "/uv/", "/epoxy/", "/baremux/"]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [listener]
            port = 9000

            [[mounts]]
            prefix = "/static/"
            root = "/srv/static"
            listing = true
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.listener.host, "0.0.0.0");
        assert_eq!(config.mounts.len(), 1);
        assert!(config.mounts[0].index);
        assert!(config.mounts[0].listing);
        assert_eq!(config.mounts[0].index_file, "index.html");
        assert_eq!(config.shutdown.grace_period_secs, 30);
    }

    #[test]
    fn test_log_format_parses_lowercase() {
        let config: ServerConfig = toml::from_str(
            r#"
            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
