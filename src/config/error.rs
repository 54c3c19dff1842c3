//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration could not be loaded or accepted.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value parsed but is out of range; `field` is the dotted TOML path.
    #[error("invalid value for '{field}': {message}")]
    Validation { field: String, message: String },
}

impl ConfigError {
    /// Dotted TOML path of the offending setting, for validation errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}
