//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config: ServerConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build the effective configuration: defaults or `path`, then the `PORT`
/// environment override.
pub fn load_effective(path: Option<&Path>, port_env: Option<&str>) -> Result<ServerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => {
            let config = ServerConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };

    apply_port_override(&mut config, port_env);
    Ok(config)
}

/// Apply a raw `PORT` value on top of `config`. Unusable values keep the
/// configured port.
pub fn apply_port_override(config: &mut ServerConfig, port_env: Option<&str>) {
    let Some(raw) = port_env else {
        return;
    };
    match parse_port(raw) {
        Some(port) => config.listener.port = port,
        None => tracing::warn!(
            value = raw,
            port = config.listener.port,
            "Ignoring unusable PORT value"
        ),
    }
}

fn parse_port(raw: &str) -> Option<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_port_override() {
        let port = |raw: Option<&str>| {
            let mut config = ServerConfig::default();
            apply_port_override(&mut config, raw);
            config.listener.port
        };

        assert_eq!(port(None), 8080);
        assert_eq!(port(Some("")), 8080);
        assert_eq!(port(Some("abc")), 8080);
        assert_eq!(port(Some("0")), 8080);
        assert_eq!(port(Some("70000")), 8080);
        assert_eq!(port(Some("-1")), 8080);
        assert_eq!(port(Some("3000")), 3000);
        assert_eq!(port(Some(" 3000 ")), 3000);
    }

    #[test]
    fn test_env_port_overrides_default() {
        let config = load_effective(None, Some("9001")).unwrap();
        assert_eq!(config.listener.port, 9001);

        let config = load_effective(None, Some("zero")).unwrap();
        assert_eq!(config.listener.port, 8080);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [listener]
            host = "127.0.0.1"
            port = 0

            [policy]
            allowed_embed_origins = []
            "#
        )
        .unwrap();

        let config = load_effective(Some(file.path()), None).unwrap();
        assert_eq!(config.listener.host, "127.0.0.1");
        assert_eq!(config.listener.port, 0);
        assert!(config.policy.allowed_embed_origins.is_empty());

        // An invalid PORT keeps the file's port.
        let config = load_effective(Some(file.path()), Some("nope")).unwrap();
        assert_eq!(config.listener.port, 0);
    }

    #[test]
    fn test_invalid_file_reports_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [tunnel]
            path = "wisp"
            "#
        )
        .unwrap();

        match load_config(file.path()) {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors, vec![ValidationError::InvalidTunnelPath("wisp".into())]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
