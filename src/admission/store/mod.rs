//! Bucket storage backends
//!
//! The controller only needs two primitives from a store: read a record, and
//! replace it if nobody else has written since it was read. Both backends
//! implement that with a `version` comparison:
//!
//! - [`MemoryBucketStore`]: sharded in-process map, per-key entry locks
//! - [`RedisBucketStore`]: shared across instances, CAS via a Lua script
//! - [`FailoverBucketStore`]: Redis first, memory when Redis misbehaves

mod failover;
mod memory;
mod redis_store;

pub use self::failover::FailoverBucketStore;
pub use self::memory::MemoryBucketStore;
pub use self::redis_store::RedisBucketStore;

use super::bucket::BucketRecord;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage connection failed: {0}")]
    Connection(String),

    #[error("storage operation failed: {0}")]
    Operation(String),

    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),

    #[error("corrupt bucket record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key-value store holding bucket records.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Short backend name for logs, metrics and `/health`.
    fn name(&self) -> &'static str;

    /// Current record for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<BucketRecord>, StoreError>;

    /// Write `new` only if the stored record still has `expected`'s version
    /// (or is still absent when `expected` is `None`).
    ///
    /// Returns `Ok(false)` on a lost race.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&BucketRecord>,
        new: &BucketRecord,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Unconditional write.
    async fn put(&self, key: &str, record: &BucketRecord, ttl: Duration)
        -> Result<(), StoreError>;

    /// Cheap liveness check against the backend.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Whether the store is currently serving from a fallback.
    fn is_degraded(&self) -> bool {
        false
    }
}
