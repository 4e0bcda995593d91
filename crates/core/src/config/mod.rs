//! Application configuration.
//!
//! TOML file merged with `SEEDRELAY_`-prefixed environment variables.
//! Per-tracker upload-config documents are separate; see
//! [`crate::tracker_config`].

mod loader;
mod types;
mod validate;

use thiserror::Error;

pub use loader::{load_config, load_config_from_str};
pub use types::*;
pub use validate::validate_config;

/// Error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}
