//! Structured logging helpers
//!
//! Filter directive construction for `tracing-subscriber` and request ID
//! handling for correlating admission and routing logs.

pub mod middleware;

pub use middleware::{generate_request_id, request_id_from_headers, REQUEST_ID_HEADER};

/// Build filter directives string from LoggingConfig
///
/// Constructs a tracing filter string that includes the base log level
/// and any component-specific log levels configured in the LoggingConfig.
///
/// # Examples
///
/// ```
/// use switchyard::config::logging::{LogFormat, LoggingConfig};
/// use switchyard::logging::build_filter_directives;
/// use std::collections::BTreeMap;
///
/// let mut component_levels = BTreeMap::new();
/// component_levels.insert("admission".to_string(), "debug".to_string());
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Pretty,
///     component_levels: Some(component_levels),
/// };
///
/// let filter_str = build_filter_directives(&config);
/// assert_eq!(filter_str, "info,switchyard::admission=debug");
/// ```
pub fn build_filter_directives(config: &crate::config::LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        for (component, level) in component_levels {
            filter_str.push_str(&format!(",switchyard::{}={}", component, level));
        }
    }

    filter_str
}
