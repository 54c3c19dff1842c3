//! In-process bucket store

use super::{BucketStore, StoreError};
use crate::admission::bucket::BucketRecord;
use crate::admission::clock::{Clock, SystemClock};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct StoredBucket {
    record: BucketRecord,
    expires_at_ms: i64,
}

impl StoredBucket {
    fn is_live(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at_ms
    }
}

/// Buckets kept in a sharded `DashMap`.
///
/// Compare-and-set holds the shard lock for one key only, so different keys
/// proceed in parallel. Expired records read as absent and are physically
/// removed by [`MemoryBucketStore::purge_expired`] or when overwritten.
#[derive(Debug)]
pub struct MemoryBucketStore {
    buckets: DashMap<String, StoredBucket>,
    clock: Arc<dyn Clock>,
}

impl MemoryBucketStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: DashMap::new(),
            clock,
        }
    }

    /// Number of stored buckets, expired ones included.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drop expired buckets. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.buckets.len();
        self.buckets.retain(|_, stored| stored.is_live(now));
        let removed = before.saturating_sub(self.buckets.len());
        if removed > 0 {
            tracing::debug!(removed, "Purged expired rate limit buckets");
        }
        removed
    }

    fn stored(&self, record: &BucketRecord, ttl: Duration, now_ms: i64) -> StoredBucket {
        StoredBucket {
            record: record.clone(),
            expires_at_ms: now_ms.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)),
        }
    }
}

impl Default for MemoryBucketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<BucketRecord>, StoreError> {
        let now = self.clock.now_ms();
        Ok(self
            .buckets
            .get(key)
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.record.clone()))
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&BucketRecord>,
        new: &BucketRecord,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now_ms();
        match self.buckets.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let current = Some(occupied.get())
                    .filter(|stored| stored.is_live(now))
                    .map(|stored| stored.record.version);
                if current != expected.map(|r| r.version) {
                    return Ok(false);
                }
                occupied.insert(self.stored(new, ttl, now));
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                if expected.is_some() {
                    return Ok(false);
                }
                vacant.insert(self.stored(new, ttl, now));
                Ok(true)
            }
        }
    }

    async fn put(
        &self,
        key: &str,
        record: &BucketRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let now = self.clock.now_ms();
        self.buckets
            .insert(key.to_string(), self.stored(record, ttl, now));
        Ok(())
    }
}
