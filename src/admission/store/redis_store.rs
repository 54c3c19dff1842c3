//! Redis-backed bucket store shared by every instance
//!
//! Records are stored as JSON under `switchyard:bucket:{key}` with a `PX`
//! expiry equal to the policy's retention, so idle buckets disappear without
//! any sweeper. Compare-and-set runs as a Lua script so the version check and
//! the write are one atomic step on the server.

use super::{BucketStore, StoreError};
use crate::admission::bucket::BucketRecord;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;

const KEY_PREFIX: &str = "switchyard:bucket:";

/// Redis rejects `PX` values that overflow its clock; cap expiry at ten years.
const MAX_TTL_MS: u64 = 10 * 365 * 24 * 3600 * 1000;

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis())
        .unwrap_or(u64::MAX)
        .clamp(1, MAX_TTL_MS)
}

/// KEYS[1] bucket key, ARGV[1] expected version ("" = must be absent),
/// ARGV[2] new JSON record, ARGV[3] TTL in milliseconds.
const CAS_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if current then
  if ARGV[1] == '' then return 0 end
  local decoded = cjson.decode(current)
  if tonumber(decoded['version']) ~= tonumber(ARGV[1]) then return 0 end
elseif ARGV[1] ~= '' then
  return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'PX', ARGV[3])
return 1
"#;

/// Bucket store on a Redis server.
///
/// The connection is opened on first use and dropped after an I/O error or
/// timeout, so a server that comes back is picked up by the next call.
pub struct RedisBucketStore {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
    cas_script: redis::Script,
    timeout: Duration,
}

impl RedisBucketStore {
    /// Parse `redis_url` without touching the network.
    pub fn open(redis_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(|e| {
            StoreError::Connection(format!("failed to open Redis client: {e}"))
        })?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
            cas_script: redis::Script::new(CAS_SCRIPT),
            timeout,
        })
    }

    /// Open and verify the server answers `PING` within `timeout`.
    pub async fn connect(redis_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let store = Self::open(redis_url, timeout)?;
        store.ping().await?;
        tracing::debug!(timeout_ms = timeout.as_millis() as u64, "Connected to Redis bucket store");
        Ok(store)
    }

    fn redis_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = match tokio::time::timeout(
            self.timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                return Err(StoreError::Connection(format!(
                    "failed to get connection: {e}"
                )))
            }
            Err(_) => return Err(StoreError::Timeout(self.timeout)),
        };
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn forget_connection(&self) {
        self.conn.lock().await.take();
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
                    self.forget_connection().await;
                }
                Err(StoreError::Operation(format!("{op} failed: {e}")))
            }
            Err(_) => {
                self.forget_connection().await;
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }
}

#[async_trait]
impl BucketStore for RedisBucketStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _pong: String = self
            .bounded("PING", async { redis::cmd("PING").query_async(&mut conn).await })
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<BucketRecord>, StoreError> {
        let redis_key = Self::redis_key(key);
        let mut conn = self.connection().await?;
        let raw: Option<String> = self
            .bounded("GET", async {
                redis::cmd("GET").arg(&redis_key).query_async(&mut conn).await
            })
            .await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&BucketRecord>,
        new: &BucketRecord,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let redis_key = Self::redis_key(key);
        let expected_version = expected
            .map(|r| r.version.to_string())
            .unwrap_or_default();
        let json = serde_json::to_string(new)?;
        let ttl_ms = ttl_millis(ttl);
        let mut conn = self.connection().await?;

        let applied: i64 = self
            .bounded("CAS", async {
                self.cas_script
                    .key(&redis_key)
                    .arg(&expected_version)
                    .arg(&json)
                    .arg(ttl_ms)
                    .invoke_async(&mut conn)
                    .await
            })
            .await?;

        Ok(applied == 1)
    }

    async fn put(
        &self,
        key: &str,
        record: &BucketRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let redis_key = Self::redis_key(key);
        let json = serde_json::to_string(record)?;
        let ttl_ms = ttl_millis(ttl);
        let mut conn = self.connection().await?;

        self.bounded("SET", async {
            redis::cmd("SET")
                .arg(&redis_key)
                .arg(&json)
                .arg("PX")
                .arg(ttl_ms)
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }
}
