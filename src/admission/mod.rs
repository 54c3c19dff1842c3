//! Admission control with lazily refilled token buckets
//!
//! One bucket exists per `(endpoint, caller, tier)`. Buckets are refilled on
//! read from the time elapsed since the last write, so idle keys cost
//! nothing and no background work runs. Bucket records live in an injected
//! [`BucketStore`]; concurrent requests for the same key are serialized by
//! compare-and-set on the record version, retried on conflict.
//!
//! # Example
//!
//! ```rust
//! use switchyard::admission::{AdmissionController, MemoryBucketStore, PolicyTable};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let controller = AdmissionController::new(
//!     Arc::new(MemoryBucketStore::new()),
//!     PolicyTable::builtin(),
//! );
//!
//! let decision = controller.consume("chat:send", "user-42", "free").await?;
//! assert!(decision.allowed);
//! assert_eq!(decision.remaining, 19);
//! # Ok(())
//! # }
//! ```

pub mod bucket;
pub mod clock;
pub mod error;
pub mod policy;
pub mod store;

pub use bucket::{BucketKey, BucketRecord};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::AdmissionError;
pub use policy::{PolicyTable, RateLimitPolicy};
pub use store::{
    BucketStore, FailoverBucketStore, MemoryBucketStore, RedisBucketStore, StoreError,
};

use crate::caller::CallerId;
use crate::tier::{Endpoint, Tier};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Compare-and-set attempts per request before reporting contention.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Outcome of one admission check.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionDecision {
    pub allowed: bool,
    /// Burst capacity of the applied policy
    pub limit: u32,
    /// Whole tokens left after this request
    pub remaining: u32,
    /// Epoch millis by which the bucket is full again (a hint, not a promise)
    pub reset_at_ms: i64,
    /// Wait before the next request can succeed; zero when allowed
    pub retry_after: Duration,
}

impl AdmissionDecision {
    /// `retry_after` rounded up to whole seconds, as sent in `Retry-After`.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs_f64().ceil() as u64;
        if self.allowed {
            secs
        } else {
            secs.max(1)
        }
    }

    fn allowed(record: &BucketRecord, now_ms: i64) -> Self {
        Self {
            allowed: true,
            limit: record.policy.max_tokens.floor() as u32,
            remaining: record.tokens.floor() as u32,
            reset_at_ms: reset_at(record, now_ms),
            retry_after: Duration::ZERO,
        }
    }

    fn denied(record: &BucketRecord, now_ms: i64) -> Self {
        Self {
            allowed: false,
            limit: record.policy.max_tokens.floor() as u32,
            remaining: 0,
            reset_at_ms: reset_at(record, now_ms),
            retry_after: record.time_until_token(),
        }
    }
}

fn reset_at(record: &BucketRecord, now_ms: i64) -> i64 {
    let to_full_ms = record.time_until_full().as_millis().min(i64::MAX as u128) as i64;
    now_ms.saturating_add(to_full_ms)
}

/// Token-bucket admission controller over a pluggable store.
#[derive(Clone)]
pub struct AdmissionController {
    store: Arc<dyn BucketStore>,
    policies: Arc<PolicyTable>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
}

impl AdmissionController {
    pub fn new(store: Arc<dyn BucketStore>, policies: PolicyTable) -> Self {
        Self {
            store,
            policies: Arc::new(policies),
            clock: Arc::new(SystemClock),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    pub fn store(&self) -> &Arc<dyn BucketStore> {
        &self.store
    }

    /// Admission check from untrusted request strings.
    ///
    /// Unknown endpoints and tiers resolve to their most restrictive variants.
    /// Only a malformed caller id is an error.
    pub async fn consume(
        &self,
        endpoint: &str,
        caller_id: &str,
        tier: &str,
    ) -> Result<AdmissionDecision, AdmissionError> {
        let caller = CallerId::parse(caller_id)?;
        self.consume_for(
            Endpoint::from_untrusted(endpoint),
            &caller,
            Tier::from_untrusted(tier),
        )
        .await
    }

    /// Admission check for already parsed inputs.
    pub async fn consume_for(
        &self,
        endpoint: Endpoint,
        caller: &CallerId,
        tier: Tier,
    ) -> Result<AdmissionDecision, AdmissionError> {
        let started = Instant::now();
        let policy = self.policies.get_policy(endpoint, tier);
        let key = BucketKey::new(endpoint.as_str(), caller.as_str(), tier.as_str());

        let decision = self.consume_with_policy(&key, &policy).await?;

        crate::metrics::record_admission(endpoint, tier, decision.allowed, started.elapsed());
        if decision.allowed {
            tracing::debug!(
                key = %key,
                remaining = decision.remaining,
                "Request admitted"
            );
        } else {
            tracing::info!(
                endpoint = %endpoint,
                caller = %caller,
                tier = %tier,
                retry_after_ms = decision.retry_after.as_millis() as u64,
                disabled = policy.is_disabled(),
                "Request denied by rate limit"
            );
        }
        Ok(decision)
    }

    /// Take one token from `key` under `policy`.
    pub async fn consume_with_policy(
        &self,
        key: &BucketKey,
        policy: &RateLimitPolicy,
    ) -> Result<AdmissionDecision, AdmissionError> {
        let ttl = policy.retention();

        for attempt in 1..=self.max_attempts {
            let now = self.clock.now_ms();
            let current = self.store.get(key.as_str()).await?;

            let base = match &current {
                Some(record) if record.policy == *policy => record.clone(),
                Some(record) => record.rebased(*policy),
                None => BucketRecord::full(*policy, now),
            };
            let refilled = base.refilled(now);

            let Some(next) = refilled.take() else {
                return Ok(AdmissionDecision::denied(&refilled, now));
            };

            if self
                .store
                .compare_and_set(key.as_str(), current.as_ref(), &next, ttl)
                .await?
            {
                return Ok(AdmissionDecision::allowed(&next, now));
            }

            tracing::trace!(key = %key, attempt, "Bucket write conflict, retrying");
        }

        tracing::warn!(
            key = %key,
            attempts = self.max_attempts,
            "Giving up on contended rate limit bucket"
        );
        Err(AdmissionError::Contention {
            key: key.to_string(),
            attempts: self.max_attempts,
        })
    }

    /// Restore a caller's bucket to full capacity. Idempotent.
    pub async fn reset(
        &self,
        endpoint: &str,
        caller_id: &str,
        tier: &str,
    ) -> Result<(), AdmissionError> {
        let caller = CallerId::parse(caller_id)?;
        let endpoint = Endpoint::from_untrusted(endpoint);
        let tier = Tier::from_untrusted(tier);
        let policy = self.policies.get_policy(endpoint, tier);
        let key = BucketKey::new(endpoint.as_str(), caller.as_str(), tier.as_str());

        self.reset_key(&key, &policy).await?;
        tracing::info!(
            endpoint = %endpoint,
            caller = %caller,
            tier = %tier,
            "Rate limit bucket reset"
        );
        Ok(())
    }

    /// Write a full bucket for `key`.
    ///
    /// The write is a compare-and-set on the version just read, so a reset
    /// never shares a version with a concurrent consume. If the key stays
    /// contended for every attempt the full bucket is written unconditionally.
    pub async fn reset_key(
        &self,
        key: &BucketKey,
        policy: &RateLimitPolicy,
    ) -> Result<(), AdmissionError> {
        let ttl = policy.retention();
        for _ in 0..self.max_attempts {
            let now = self.clock.now_ms();
            let current = self.store.get(key.as_str()).await?;
            let record = BucketRecord {
                version: current.as_ref().map_or(0, |r| r.version + 1),
                ..BucketRecord::full(*policy, now)
            };
            if self
                .store
                .compare_and_set(key.as_str(), current.as_ref(), &record, ttl)
                .await?
            {
                return Ok(());
            }
        }

        tracing::warn!(key = %key, "Reset lost every race, overwriting bucket");
        let now = self.clock.now_ms();
        let version = self
            .store
            .get(key.as_str())
            .await?
            .map_or(0, |r| r.version + 1);
        let record = BucketRecord {
            version,
            ..BucketRecord::full(*policy, now)
        };
        self.store.put(key.as_str(), &record, ttl).await?;
        Ok(())
    }

    /// Current state of a caller's bucket, refilled to now, without taking a token.
    pub async fn peek(
        &self,
        endpoint: &str,
        caller_id: &str,
        tier: &str,
    ) -> Result<BucketRecord, AdmissionError> {
        let caller = CallerId::parse(caller_id)?;
        let endpoint = Endpoint::from_untrusted(endpoint);
        let tier = Tier::from_untrusted(tier);
        let policy = self.policies.get_policy(endpoint, tier);
        let key = BucketKey::new(endpoint.as_str(), caller.as_str(), tier.as_str());

        let now = self.clock.now_ms();
        let record = match self.store.get(key.as_str()).await? {
            Some(record) if record.policy == policy => record,
            Some(record) => record.rebased(policy),
            None => BucketRecord::full(policy, now),
        };
        Ok(record.refilled(now))
    }
}
