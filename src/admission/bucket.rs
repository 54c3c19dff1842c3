//! Bucket records and lazy refill arithmetic

use super::policy::{saturating_secs, RateLimitPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Storage key for one (endpoint, caller, tier) bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey(String);

impl BucketKey {
    pub fn new(endpoint: &str, caller_id: &str, tier: &str) -> Self {
        Self(format!("{}:{}:{}", endpoint, caller_id, tier))
    }

    /// Use an arbitrary string as key (tests, operator tooling).
    pub fn raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted bucket state.
///
/// `version` increases on every write and is what compare-and-set compares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRecord {
    pub tokens: f64,
    pub last_refill_ms: i64,
    pub policy: RateLimitPolicy,
    pub version: u64,
}

impl BucketRecord {
    /// A bucket at full capacity.
    pub fn full(policy: RateLimitPolicy, now_ms: i64) -> Self {
        Self {
            tokens: policy.max_tokens,
            last_refill_ms: now_ms,
            policy,
            version: 0,
        }
    }

    /// Move onto a different policy, keeping the token count within the new cap.
    pub fn rebased(&self, policy: RateLimitPolicy) -> Self {
        Self {
            tokens: self.tokens.clamp(0.0, policy.max_tokens),
            policy,
            ..self.clone()
        }
    }

    /// Tokens accrued up to `now_ms`, capped at `max_tokens`.
    ///
    /// A clock behind `last_refill_ms` adds nothing and does not move the
    /// refill timestamp backwards.
    pub fn refilled(&self, now_ms: i64) -> Self {
        let elapsed_ms = (now_ms - self.last_refill_ms).max(0);
        let accrued = elapsed_ms as f64 / 1000.0 * self.policy.refill_rate_per_second;
        Self {
            tokens: (self.tokens + accrued).clamp(0.0, self.policy.max_tokens),
            last_refill_ms: self.last_refill_ms.max(now_ms),
            ..self.clone()
        }
    }

    /// Take one token if available, returning the next record to persist.
    pub fn take(&self) -> Option<Self> {
        if self.tokens >= 1.0 {
            Some(Self {
                tokens: self.tokens - 1.0,
                version: self.version + 1,
                ..self.clone()
            })
        } else {
            None
        }
    }

    /// Wait until one whole token is available.
    pub fn time_until_token(&self) -> Duration {
        if self.policy.is_disabled() || self.policy.refill_rate_per_second <= 0.0 {
            return Duration::from_millis(self.policy.refill_interval_ms);
        }
        let missing = (1.0 - self.tokens).max(0.0);
        saturating_secs(missing / self.policy.refill_rate_per_second)
    }

    /// Upper bound on the time until the bucket is full again.
    pub fn time_until_full(&self) -> Duration {
        let missing = (self.policy.max_tokens - self.tokens).max(0.0);
        if missing == 0.0 {
            Duration::ZERO
        } else if self.policy.refill_rate_per_second > 0.0 {
            saturating_secs(missing / self.policy.refill_rate_per_second)
        } else {
            Duration::from_millis(self.policy.refill_interval_ms)
        }
    }
}
