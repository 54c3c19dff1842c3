//! `[logging]` section

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

/// Modules that accept a per-component level under `[logging.component_levels]`.
pub const LOG_COMPONENTS: [&str; 7] = [
    "admission",
    "api",
    "cli",
    "config",
    "logging",
    "metrics",
    "routing",
];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    /// One JSON object per event, for log shippers
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}', expected pretty or json", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base `tracing` level or directive, e.g. `info` or `warn,tower_http=debug`
    pub level: String,
    pub format: LogFormat,
    /// Overrides for `switchyard::<component>`, e.g. `admission = "debug"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_levels: Option<BTreeMap<String, String>>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            component_levels: None,
        }
    }
}

impl LoggingConfig {
    /// Components must be known modules with plain levels, and the combined
    /// filter must parse.
    pub fn validate(&self) -> Result<(), String> {
        // A bare word is a target to EnvFilter; in `level` it must be a level
        for segment in self.level.split(',').map(str::trim) {
            if !segment.is_empty() && !segment.contains('=') {
                parse_level(segment)?;
            }
        }
        if let Some(levels) = &self.component_levels {
            for (component, level) in levels {
                if !LOG_COMPONENTS.contains(&component.as_str()) {
                    return Err(format!(
                        "unknown component '{}', expected one of {}",
                        component,
                        LOG_COMPONENTS.join(", ")
                    ));
                }
                parse_level(level)?;
            }
        }
        let directives = crate::logging::build_filter_directives(self);
        tracing_subscriber::EnvFilter::try_new(&directives)
            .map(|_| ())
            .map_err(|e| format!("invalid filter '{}': {}", directives, e))
    }
}

fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value
        .parse::<LevelFilter>()
        .map_err(|_| format!("invalid log level '{}'", value))
}
