//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, PORT override)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → moved into Lifecycle at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults so the server runs without a file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_port_override, load_config, load_effective, ConfigError};
pub use schema::{
    ListenerConfig, LogFormat, MountConfig, ObservabilityConfig, PolicyConfig, ServerConfig,
    ShutdownConfig, TimeoutConfig, TunnelConfig, DEFAULT_PORT,
};
pub use validation::{validate_config, ValidationError};
