//! Fail-open wrapper around a shared store

use super::{BucketStore, MemoryBucketStore, StoreError};
use crate::admission::bucket::BucketRecord;
use crate::admission::clock::{Clock, SystemClock};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Routes bucket traffic to a shared primary store and falls back to an
/// in-process store when the primary errors or times out.
///
/// After a primary failure every call goes to the fallback for `cooldown`,
/// then the primary is tried again. Failures never reach the caller: global
/// quotas become per-instance quotas until the primary recovers.
pub struct FailoverBucketStore {
    primary: Option<Arc<dyn BucketStore>>,
    fallback: Arc<MemoryBucketStore>,
    cooldown: Duration,
    clock: Arc<dyn Clock>,
    degraded: AtomicBool,
    retry_primary_at_ms: AtomicI64,
}

impl FailoverBucketStore {
    pub fn new(
        primary: Option<Arc<dyn BucketStore>>,
        fallback: Arc<MemoryBucketStore>,
        cooldown: Duration,
    ) -> Self {
        Self {
            degraded: AtomicBool::new(false),
            primary,
            fallback,
            cooldown,
            clock: Arc::new(SystemClock),
            retry_primary_at_ms: AtomicI64::new(i64::MAX),
        }
    }

    /// Memory-only store, used when no shared store is configured.
    pub fn memory_only(fallback: Arc<MemoryBucketStore>) -> Self {
        Self::new(None, fallback, Duration::ZERO)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn fallback(&self) -> &Arc<MemoryBucketStore> {
        &self.fallback
    }

    /// The primary, unless it is cooling down after a failure.
    fn healthy_primary(&self) -> Option<&Arc<dyn BucketStore>> {
        let primary = self.primary.as_ref()?;
        if self.degraded.load(Ordering::Acquire)
            && self.clock.now_ms() < self.retry_primary_at_ms.load(Ordering::Acquire)
        {
            return None;
        }
        Some(primary)
    }

    fn mark_failed(&self, primary: &dyn BucketStore, op: &'static str, error: &StoreError) {
        let retry_at = self
            .clock
            .now_ms()
            .saturating_add(self.cooldown.as_millis() as i64);
        self.retry_primary_at_ms.store(retry_at, Ordering::Release);
        metrics::counter!("switchyard_storage_failovers_total", "backend" => primary.name())
            .increment(1);

        if !self.degraded.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                backend = primary.name(),
                operation = op,
                error = %error,
                cooldown_ms = self.cooldown.as_millis() as u64,
                "Bucket store unavailable, failing open to in-process buckets"
            );
        } else {
            tracing::debug!(
                backend = primary.name(),
                operation = op,
                error = %error,
                "Bucket store still unavailable"
            );
        }
    }

    /// Ping the primary and update the degraded state from the answer.
    ///
    /// A primary that is already down when the process starts is recorded
    /// like any other failure: `/health` reports degraded, the failover
    /// counter moves, and traffic returns to it after the cooldown.
    pub async fn check_primary(&self) -> bool {
        let Some(primary) = self.primary.as_ref() else {
            return false;
        };
        match primary.ping().await {
            Ok(()) => {
                self.mark_recovered(primary.as_ref());
                true
            }
            Err(e) => {
                self.mark_failed(primary.as_ref(), "ping", &e);
                false
            }
        }
    }

    fn mark_recovered(&self, primary: &dyn BucketStore) {
        if self.degraded.swap(false, Ordering::AcqRel) {
            self.retry_primary_at_ms.store(i64::MAX, Ordering::Release);
            tracing::info!(backend = primary.name(), "Bucket store recovered");
        }
    }
}

#[async_trait]
impl BucketStore for FailoverBucketStore {
    fn name(&self) -> &'static str {
        match &self.primary {
            Some(primary) => primary.name(),
            None => self.fallback.name(),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<BucketRecord>, StoreError> {
        if let Some(primary) = self.healthy_primary() {
            match primary.get(key).await {
                Ok(record) => {
                    self.mark_recovered(primary.as_ref());
                    return Ok(record);
                }
                Err(e) => self.mark_failed(primary.as_ref(), "get", &e),
            }
        }
        self.fallback.get(key).await
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&BucketRecord>,
        new: &BucketRecord,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        if let Some(primary) = self.healthy_primary() {
            match primary.compare_and_set(key, expected, new, ttl).await {
                Ok(applied) => {
                    self.mark_recovered(primary.as_ref());
                    return Ok(applied);
                }
                // The expected record may have come from the primary; report a
                // lost race so the caller re-reads from the fallback.
                Err(e) => {
                    self.mark_failed(primary.as_ref(), "compare_and_set", &e);
                    return Ok(false);
                }
            }
        }
        self.fallback.compare_and_set(key, expected, new, ttl).await
    }

    async fn put(
        &self,
        key: &str,
        record: &BucketRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        if let Some(primary) = self.healthy_primary() {
            match primary.put(key, record, ttl).await {
                Ok(()) => {
                    self.mark_recovered(primary.as_ref());
                    return Ok(());
                }
                Err(e) => self.mark_failed(primary.as_ref(), "put", &e),
            }
        }
        self.fallback.put(key, record, ttl).await
    }

    fn is_degraded(&self) -> bool {
        self.primary.is_some() && self.degraded.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::clock::ManualClock;
    use crate::admission::policy::RateLimitPolicy;
    use std::sync::atomic::AtomicUsize;

    const TTL: Duration = Duration::from_secs(60);

    /// Primary that fails while `down` is set.
    struct FlakyStore {
        inner: MemoryBucketStore,
        down: AtomicBool,
        calls: AtomicUsize,
    }

    impl FlakyStore {
        fn new(down: bool) -> Self {
            Self {
                inner: MemoryBucketStore::new(),
                down: AtomicBool::new(down),
                calls: AtomicUsize::new(0),
            }
        }

        fn check(&self) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.down.load(Ordering::SeqCst) {
                Err(StoreError::Connection("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl BucketStore for FlakyStore {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn ping(&self) -> Result<(), StoreError> {
            self.check()
        }

        async fn get(&self, key: &str) -> Result<Option<BucketRecord>, StoreError> {
            self.check()?;
            self.inner.get(key).await
        }

        async fn compare_and_set(
            &self,
            key: &str,
            expected: Option<&BucketRecord>,
            new: &BucketRecord,
            ttl: Duration,
        ) -> Result<bool, StoreError> {
            self.check()?;
            self.inner.compare_and_set(key, expected, new, ttl).await
        }

        async fn put(
            &self,
            key: &str,
            record: &BucketRecord,
            ttl: Duration,
        ) -> Result<(), StoreError> {
            self.check()?;
            self.inner.put(key, record, ttl).await
        }
    }

    fn record() -> BucketRecord {
        BucketRecord::full(RateLimitPolicy::per_window(5, Duration::from_secs(60)), 0)
    }

    #[tokio::test]
    async fn test_healthy_primary_serves_reads_and_writes() {
        let primary = Arc::new(FlakyStore::new(false));
        let fallback = Arc::new(MemoryBucketStore::new());
        let store = FailoverBucketStore::new(
            Some(primary.clone() as Arc<dyn BucketStore>),
            fallback.clone(),
            Duration::from_secs(30),
        );

        store.put("k", &record(), TTL).await.unwrap();
        assert!(store.get("k").await.unwrap().is_some());
        assert!(fallback.is_empty());
        assert!(!store.is_degraded());
        assert_eq!(store.name(), "flaky");
    }

    #[tokio::test]
    async fn test_failing_primary_falls_back_without_error() {
        let primary = Arc::new(FlakyStore::new(true));
        let fallback = Arc::new(MemoryBucketStore::new());
        let store = FailoverBucketStore::new(
            Some(primary.clone() as Arc<dyn BucketStore>),
            fallback.clone(),
            Duration::from_secs(30),
        );

        store.put("k", &record(), TTL).await.unwrap();
        assert!(store.is_degraded());
        assert!(store.get("k").await.unwrap().is_some());
        assert_eq!(fallback.len(), 1);
    }

    #[tokio::test]
    async fn test_cooldown_skips_primary_then_retries() {
        let clock = ManualClock::new(0);
        let primary = Arc::new(FlakyStore::new(true));
        let store = FailoverBucketStore::new(
            Some(primary.clone() as Arc<dyn BucketStore>),
            Arc::new(MemoryBucketStore::new()),
            Duration::from_secs(30),
        )
        .with_clock(Arc::new(clock.clone()));

        store.get("k").await.unwrap();
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);

        // Within the cooldown the primary is not touched
        store.get("k").await.unwrap();
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);

        // After the cooldown it is tried again and recovery clears the flag
        primary.down.store(false, Ordering::SeqCst);
        clock.advance(Duration::from_secs(31));
        store.get("k").await.unwrap();
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
        assert!(!store.is_degraded());
    }

    #[tokio::test]
    async fn test_failed_cas_reports_lost_race() {
        let primary = Arc::new(FlakyStore::new(true));
        let store = FailoverBucketStore::new(
            Some(primary as Arc<dyn BucketStore>),
            Arc::new(MemoryBucketStore::new()),
            Duration::from_secs(30),
        );

        let applied = store
            .compare_and_set("k", None, &record(), TTL)
            .await
            .unwrap();
        assert!(!applied);
        // The retry lands on the fallback
        assert!(store
            .compare_and_set("k", None, &record(), TTL)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_memory_only_is_not_degraded() {
        let store = FailoverBucketStore::memory_only(Arc::new(MemoryBucketStore::new()));
        assert_eq!(store.name(), "memory");
        assert!(!store.is_degraded());
        store.put("k", &record(), TTL).await.unwrap();
        assert!(store.get("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_primary_down_at_startup_is_degraded_until_it_answers() {
        let clock = ManualClock::new(0);
        let primary = Arc::new(FlakyStore::new(true));
        let fallback = Arc::new(MemoryBucketStore::new());
        let store = FailoverBucketStore::new(
            Some(primary.clone() as Arc<dyn BucketStore>),
            fallback.clone(),
            Duration::from_secs(30),
        )
        .with_clock(Arc::new(clock.clone()));

        assert!(!store.check_primary().await);
        assert!(store.is_degraded());
        assert_eq!(store.name(), "flaky");

        // Served locally during the cooldown without touching the primary
        store.put("k", &record(), TTL).await.unwrap();
        assert_eq!(fallback.len(), 1);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);

        primary.down.store(false, Ordering::SeqCst);
        clock.advance(Duration::from_secs(31));
        store.put("k", &record(), TTL).await.unwrap();
        assert!(!store.is_degraded());
        assert!(primary.inner.get("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_check_primary_without_primary_reports_false() {
        let store = FailoverBucketStore::memory_only(Arc::new(MemoryBucketStore::new()));
        assert!(!store.check_primary().await);
        assert!(!store.is_degraded());
    }
}
