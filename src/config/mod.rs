//! Configuration module for Switchyard
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`SWITCHYARD_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use switchyard::config::SwitchyardConfig;
//!
//! let config = SwitchyardConfig::default();
//! assert_eq!(config.server.port, 8080);
//!
//! let toml = r#"
//! [server]
//! port = 9000
//! "#;
//! let config: SwitchyardConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.server.port, 9000);
//! ```

pub mod admission;
pub mod error;
pub mod logging;
pub mod routing;
pub mod server;

pub use admission::{
    AdmissionConfig, PolicyOverride, StorageBackend, StorageConfig, MAX_WINDOW_SECONDS,
};
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use routing::RoutingConfig;
pub use server::ServerConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the Switchyard server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SwitchyardConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Rate limiting and bucket storage
    pub admission: AdmissionConfig,
    /// Model catalog and scoring
    pub routing: RoutingConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl SwitchyardConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content =
                    std::fs::read_to_string(p).map_err(|source| ConfigError::Read {
                        path: p.to_path_buf(),
                        source,
                    })?;
                toml::from_str(&content).map_err(|source| ConfigError::Parse {
                    path: p.to_path_buf(),
                    source,
                })
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports SWITCHYARD_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("SWITCHYARD_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("SWITCHYARD_HOST") {
            self.server.host = host;
        }
        if let Ok(token) = std::env::var("SWITCHYARD_ADMIN_TOKEN") {
            if !token.is_empty() {
                self.server.admin_token = Some(token);
            }
        }

        if let Ok(level) = std::env::var("SWITCHYARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SWITCHYARD_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        // A Redis URL implies the Redis backend
        if let Ok(url) = std::env::var("SWITCHYARD_REDIS_URL") {
            if !url.is_empty() {
                self.admission.storage.backend = StorageBackend::Redis;
                self.admission.storage.redis_url = Some(url);
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(validation("server.port", "port must be non-zero"));
        }
        if self.server.max_body_bytes == 0 {
            return Err(validation(
                "server.max_body_bytes",
                "body limit must be non-zero",
            ));
        }

        let storage = &self.admission.storage;
        if storage.backend == StorageBackend::Redis
            && storage.redis_url.as_deref().map_or(true, str::is_empty)
        {
            return Err(validation(
                "admission.storage.redis_url",
                "redis backend requires a URL",
            ));
        }
        if storage.timeout_ms == 0 {
            return Err(validation(
                "admission.storage.timeout_ms",
                "timeout must be non-zero",
            ));
        }
        if self.admission.max_attempts == 0 {
            return Err(validation(
                "admission.max_attempts",
                "at least one attempt is required",
            ));
        }
        for (i, entry) in self.admission.policies.iter().enumerate() {
            if entry.window_seconds == 0 || entry.window_seconds > MAX_WINDOW_SECONDS {
                return Err(validation(
                    &format!("admission.policies[{}].window_seconds", i),
                    &format!("window must be between 1 and {} seconds", MAX_WINDOW_SECONDS),
                ));
            }
        }
        if let Err((entry, message)) = self.admission.policy_table().validate() {
            return Err(validation(&format!("admission.policies {}", entry), &message));
        }

        if !self.routing.quality_boost.is_finite() || self.routing.quality_boost < 0.0 {
            return Err(validation(
                "routing.quality_boost",
                "boost must be a non-negative number",
            ));
        }
        crate::routing::ModelRouter::from_config(&self.routing)
            .map_err(|e| validation("routing", &e.to_string()))?;
        self.logging
            .validate()
            .map_err(|message| validation("logging", &message))?;

        Ok(())
    }
}

fn validation(field: &str, message: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_switchyard_config_defaults() {
        let config = SwitchyardConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.admission.storage.backend, StorageBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_parse_minimal_toml() {
        let toml = r#"
        [server]
        port = 9000
        "#;

        let config: SwitchyardConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_config_parse_example_toml() {
        let toml = include_str!("../../switchyard.example.toml");
        let config: SwitchyardConfig = toml::from_str(toml).unwrap();
        assert!(config.server.port > 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_from_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[server]\nport = 8081").unwrap();

        let config = SwitchyardConfig::load(Some(temp.path())).unwrap();
        assert_eq!(config.server.port, 8081);
    }

    #[test]
    fn test_config_missing_file_error() {
        let result = SwitchyardConfig::load(Some(Path::new("/nonexistent/switchyard.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_config_invalid_toml_error() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[server\nport = ").unwrap();
        let result = SwitchyardConfig::load(Some(temp.path()));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validate_rejects_unknown_log_component() {
        let toml = r#"
        [logging.component_levels]
        discovery = "debug"
        "#;
        let config: SwitchyardConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("logging"));
    }

    #[test]
    fn test_config_directory_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = SwitchyardConfig::load(Some(dir.path()));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_env_overrides() {
        std::env::set_var("SWITCHYARD_PORT", "9999");
        std::env::set_var("SWITCHYARD_REDIS_URL", "redis://cache:6379");
        let config = SwitchyardConfig::default().with_env_overrides();
        std::env::remove_var("SWITCHYARD_PORT");
        std::env::remove_var("SWITCHYARD_REDIS_URL");

        assert_eq!(config.server.port, 9999);
        assert_eq!(config.admission.storage.backend, StorageBackend::Redis);
        assert_eq!(
            config.admission.storage.redis_url.as_deref(),
            Some("redis://cache:6379")
        );
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut config = SwitchyardConfig::default();
        config.server.port = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { field, .. }) if field == "server.port"
        ));
    }

    #[test]
    fn test_validate_redis_requires_url() {
        let mut config = SwitchyardConfig::default();
        config.admission.storage.backend = StorageBackend::Redis;
        assert!(config.validate().is_err());

        config.admission.storage.redis_url = Some("redis://localhost".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_weights() {
        let mut config = SwitchyardConfig::default();
        config.routing.weights.quality = 0.9;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn test_validate_rejects_tier_without_models() {
        let toml = r#"
        [routing.tiers]
        free = []
        pro = ["gpt-4o"]
        business = ["gpt-4o"]
        enterprise = ["gpt-4o"]
        "#;
        let config: SwitchyardConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no eligible models"));
    }

    #[test]
    fn test_validate_rejects_zero_window_override() {
        let toml = r#"
        [[admission.policies]]
        endpoint = "chat:send"
        tier = "free"
        max_requests = 5
        window_seconds = 0
        "#;
        let config: SwitchyardConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_window_longer_than_a_year() {
        let toml = r#"
        [[admission.policies]]
        endpoint = "chat:send"
        tier = "free"
        max_requests = 5
        window_seconds = 9223372036854775807
        "#;
        let config: SwitchyardConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("window_seconds"));

        let mut config = config;
        config.admission.policies[0].window_seconds = MAX_WINDOW_SECONDS;
        assert!(config.validate().is_ok());
    }
}
