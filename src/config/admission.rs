//! Admission control configuration

use crate::admission::{PolicyTable, RateLimitPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::tier::{Endpoint, Tier};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Longest accepted policy window: one year.
pub const MAX_WINDOW_SECONDS: u64 = 366 * 24 * 3600;

/// Where bucket records live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-local; limits are per instance
    #[default]
    Memory,
    /// Shared across instances, memory fallback while unreachable
    Redis,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "redis" => Ok(StorageBackend::Redis),
            _ => Err(format!("Invalid storage backend: {}", s)),
        }
    }
}

/// Bucket storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,
    /// Upper bound on every Redis call
    pub timeout_ms: u64,
    /// How long to stay on memory after a Redis failure
    pub failover_cooldown_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            redis_url: None,
            timeout_ms: 50,
            failover_cooldown_ms: 5_000,
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn failover_cooldown(&self) -> Duration {
        Duration::from_millis(self.failover_cooldown_ms)
    }
}

/// One `[[admission.policies]]` entry replacing a built-in quota.
///
/// `max_requests = 0` disables the endpoint for the tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyOverride {
    pub endpoint: Endpoint,
    pub tier: Tier,
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl PolicyOverride {
    pub fn to_policy(&self) -> RateLimitPolicy {
        let window = Duration::from_secs(self.window_seconds);
        if self.max_requests == 0 {
            RateLimitPolicy::disabled(window)
        } else {
            RateLimitPolicy::per_window(self.max_requests, window)
        }
    }
}

/// Admission control configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    pub storage: StorageConfig,
    /// Compare-and-set attempts before a request fails with contention
    pub max_attempts: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<PolicyOverride>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            policies: Vec::new(),
        }
    }
}

impl AdmissionConfig {
    /// Built-in quotas with configured overrides applied in order.
    pub fn policy_table(&self) -> PolicyTable {
        let mut table = PolicyTable::builtin();
        for entry in &self.policies {
            table.insert(entry.endpoint, entry.tier, entry.to_policy());
        }
        table
    }
}
