//! Rate limit policies and the per-(endpoint, tier) policy table

use crate::tier::{Endpoint, Tier};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Float seconds to a `Duration`, saturating at `Duration::MAX`.
///
/// Tiny refill rates make waits larger than a `Duration` can hold.
pub(crate) fn saturating_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

/// Whole milliseconds of `d`, saturating at `u64::MAX`.
pub(crate) fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Token bucket parameters for one (endpoint, tier) pair.
///
/// `max_tokens` is the burst capacity, `refill_rate_per_second` the steady
/// state rate. `refill_interval_ms` is the policy window: how long the store
/// keeps an idle bucket, and the wait reported for disabled policies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub max_tokens: f64,
    pub refill_rate_per_second: f64,
    pub refill_interval_ms: u64,
}

impl RateLimitPolicy {
    /// `max` requests per `window`, refilling continuously.
    pub fn per_window(max: u32, window: Duration) -> Self {
        let secs = window.as_secs_f64();
        let rate = if secs > 0.0 { max as f64 / secs } else { 0.0 };
        Self {
            max_tokens: max as f64,
            refill_rate_per_second: rate,
            refill_interval_ms: saturating_millis(window),
        }
    }

    /// A policy that denies every request.
    pub fn disabled(window: Duration) -> Self {
        Self {
            max_tokens: 0.0,
            refill_rate_per_second: 0.0,
            refill_interval_ms: saturating_millis(window),
        }
    }

    /// Default for endpoint/tier pairs without an explicit entry: 10 per hour.
    pub fn most_restrictive() -> Self {
        Self::per_window(10, HOUR)
    }

    /// A bucket under this policy can never hold a whole token.
    pub fn is_disabled(&self) -> bool {
        self.max_tokens < 1.0
    }

    /// How long a store should retain an idle bucket.
    ///
    /// After this long without traffic the bucket has refilled completely,
    /// so dropping it is indistinguishable from keeping it.
    pub fn retention(&self) -> Duration {
        let window = Duration::from_millis(self.refill_interval_ms);
        if self.refill_rate_per_second > 0.0 {
            let to_full = saturating_secs(self.max_tokens / self.refill_rate_per_second);
            window.max(to_full)
        } else {
            window
        }
    }

    /// Check for values that make the bucket arithmetic meaningless.
    pub fn validate(&self) -> Result<(), String> {
        if !self.max_tokens.is_finite() || self.max_tokens < 0.0 {
            return Err(format!(
                "max_tokens must be a non-negative number, got {}",
                self.max_tokens
            ));
        }
        if !self.refill_rate_per_second.is_finite() || self.refill_rate_per_second < 0.0 {
            return Err(format!(
                "refill_rate_per_second must be a non-negative number, got {}",
                self.refill_rate_per_second
            ));
        }
        if self.refill_interval_ms == 0 {
            return Err("refill_interval_ms must be non-zero".to_string());
        }
        Ok(())
    }
}

/// Static policy lookup keyed by endpoint and tier.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: HashMap<(Endpoint, Tier), RateLimitPolicy>,
    default_policy: RateLimitPolicy,
}

impl PolicyTable {
    /// Empty table: every lookup returns the default policy.
    pub fn empty() -> Self {
        Self {
            policies: HashMap::new(),
            default_policy: RateLimitPolicy::most_restrictive(),
        }
    }

    /// The platform's built-in quotas.
    pub fn builtin() -> Self {
        use Endpoint::*;
        use Tier::*;

        let mut table = Self::empty();
        let per_minute = |n| RateLimitPolicy::per_window(n, MINUTE);
        let per_hour = |n| RateLimitPolicy::per_window(n, HOUR);

        let rows: [(Endpoint, [RateLimitPolicy; 4]); 6] = [
            (
                ChatSend,
                [per_minute(20), per_minute(60), per_minute(200), per_minute(600)],
            ),
            (
                DocumentUpload,
                [per_hour(10), per_hour(100), per_hour(500), per_hour(2000)],
            ),
            (
                DocumentAnalyze,
                [per_hour(10), per_hour(60), per_hour(300), per_hour(1000)],
            ),
            (
                ImageGenerate,
                [
                    RateLimitPolicy::disabled(HOUR),
                    per_hour(10),
                    per_hour(50),
                    per_hour(200),
                ],
            ),
            (
                TaskCreate,
                [per_minute(10), per_minute(30), per_minute(100), per_minute(300)],
            ),
            (
                SupportMessage,
                [per_minute(5), per_minute(10), per_minute(20), per_minute(50)],
            ),
        ];

        for (endpoint, policies) in rows {
            for (tier, policy) in [Free, Pro, Business, Enterprise].into_iter().zip(policies) {
                table.insert(endpoint, tier, policy);
            }
        }
        table
    }

    /// Set or replace the policy for a pair.
    pub fn insert(&mut self, endpoint: Endpoint, tier: Tier, policy: RateLimitPolicy) {
        self.policies.insert((endpoint, tier), policy);
    }

    /// Resolve a policy. Never fails; unknown pairs get the default.
    pub fn get_policy(&self, endpoint: Endpoint, tier: Tier) -> RateLimitPolicy {
        self.policies
            .get(&(endpoint, tier))
            .copied()
            .unwrap_or(self.default_policy)
    }

    pub fn default_policy(&self) -> RateLimitPolicy {
        self.default_policy
    }

    /// All explicit entries, sorted by endpoint then tier.
    pub fn entries(&self) -> Vec<(Endpoint, Tier, RateLimitPolicy)> {
        let mut entries: Vec<_> = self
            .policies
            .iter()
            .map(|(&(endpoint, tier), &policy)| (endpoint, tier, policy))
            .collect();
        entries.sort_by_key(|(endpoint, tier, _)| (*endpoint, *tier));
        entries
    }

    /// Validate every entry, reporting the first bad one.
    pub fn validate(&self) -> Result<(), (String, String)> {
        self.default_policy
            .validate()
            .map_err(|e| ("default".to_string(), e))?;
        for (endpoint, tier, policy) in self.entries() {
            policy
                .validate()
                .map_err(|e| (format!("{}/{}", endpoint, tier), e))?;
        }
        Ok(())
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::builtin()
    }
}
