//! Declarative tracker upload-config documents.
//!
//! A config-driven adapter is parameterized entirely by one of these
//! documents: auth scheme, endpoints, upload form fields, and option
//! mappings. Documents are validated on load; a document with violations
//! never produces an adapter.

mod loader;
mod types;
mod validate;

use thiserror::Error;

pub use loader::{load_tracker_config_from_str, TrackerConfigLoader};
pub use types::*;
pub use validate::validate_tracker_config;

/// Error type for tracker config operations.
#[derive(Debug, Error)]
pub enum TrackerConfigError {
    #[error("No config document for tracker: {0}")]
    NotFound(String),

    #[error("Failed to parse tracker config: {0}")]
    Parse(String),

    #[error("Invalid tracker config: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("IO error: {0}")]
    Io(String),
}
