//! Redis-backed cache store for production deployments.
//!
//! Values are stored as JSON strings. Expiry is delegated to Redis (`SET ... PX`),
//! so lazy eviction on read comes for free.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde_json::Value;
use std::time::Duration;

use crate::ports::{CacheBackend, CacheError, CacheStore, TtlStatus};

use super::pattern::KeyPattern;

fn unavailable(e: redis::RedisError) -> CacheError {
    CacheError::Unavailable(e.to_string())
}

/// Cache store over a multiplexed Redis connection.
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: MultiplexedConnection,
}

impl RedisCacheStore {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    /// Open a connection to `url` and confirm it answers `PING` within
    /// `timeout`.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(unavailable)?;

        let probe = async {
            let mut conn = client.get_multiplexed_tokio_connection().await?;
            redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
            Ok::<_, redis::RedisError>(conn)
        };

        match tokio::time::timeout(timeout, probe).await {
            Ok(Ok(conn)) => Ok(Self::new(conn)),
            Ok(Err(e)) => Err(unavailable(e)),
            Err(_) => Err(CacheError::Unavailable(format!(
                "no PING reply within {}ms",
                timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn backend(&self) -> CacheBackend {
        CacheBackend::Redis
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await.map_err(unavailable)?;

        raw.map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError> {
        let encoded =
            serde_json::to_string(&value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let mut conn = self.conn.clone();

        match ttl {
            Some(ttl) => {
                // PX rejects zero; a zero TTL is an already-expired entry.
                let millis = ttl.as_millis().max(1) as u64;
                redis::cmd("SET")
                    .arg(key)
                    .arg(encoded)
                    .arg("PX")
                    .arg(millis)
                    .query_async::<_, ()>(&mut conn)
                    .await
                    .map_err(unavailable)
            }
            None => conn.set::<_, _, ()>(key, encoded).await.map_err(unavailable),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await.map_err(unavailable)?;
        Ok(removed > 0)
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let pattern = KeyPattern::new(pattern)?;
        let mut conn = self.conn.clone();
        let mut keys: Vec<String> = conn
            .keys(pattern.to_redis_glob())
            .await
            .map_err(unavailable)?;
        keys.sort();
        Ok(keys)
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("FLUSHDB")
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn ttl_remaining(&self, key: &str) -> Result<TtlStatus, CacheError> {
        let mut conn = self.conn.clone();
        let secs: i64 = conn.ttl(key).await.map_err(unavailable)?;
        Ok(TtlStatus::from_seconds(secs))
    }

    async fn key_count(&self) -> Result<u64, CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("DBSIZE")
            .query_async::<_, u64>(&mut conn)
            .await
            .map_err(unavailable)
    }
}
