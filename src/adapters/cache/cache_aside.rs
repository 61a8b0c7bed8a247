//! Cache-aside façade.
//!
//! `CacheAside` picks its backend once, at startup: Redis if it answers a
//! `PING` within the configured timeout, the in-process store otherwise. The
//! choice is never re-probed.
//!
//! Callers treat the cache as optional. Every store error is logged here and
//! turned into the neutral answer (a miss, `false`, an empty list), so a
//! flaky Redis degrades to "proceed without cache" instead of failing the
//! request.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RedisConfig;
use crate::ports::{CacheBackend, CacheStats, CacheStore, TtlStatus};

use super::in_memory::InMemoryCacheStore;
use super::redis::RedisCacheStore;

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Shared handle to the process cache.
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
    counters: Arc<Counters>,
}

impl CacheAside {
    /// Wrap an explicit store.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            counters: Arc::new(Counters::default()),
        }
    }

    /// A façade over a fresh in-process store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCacheStore::new()))
    }

    /// Probe Redis and fall back to memory when it is unreachable.
    pub async fn connect(config: &RedisConfig) -> Self {
        match RedisCacheStore::connect(&config.url, config.timeout()).await {
            Ok(store) => {
                tracing::info!("Cache connected to Redis");
                Self::new(Arc::new(store))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unreachable, using in-memory cache");
                Self::in_memory()
            }
        }
    }

    pub fn backend(&self) -> CacheBackend {
        self.store.backend()
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        match self.store.get(key).await {
            Ok(Some(value)) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key, error = %e, "Cache get failed");
                None
            }
        }
    }

    /// Typed read. A value that no longer decodes as `T` counts as a miss.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(key, error = %e, "Cached value has unexpected shape");
                None
            }
        }
    }

    /// Store `value`. Returns whether the write was accepted.
    pub async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> bool {
        match self.store.set(key, value, ttl).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache set failed");
                false
            }
        }
    }

    /// Typed write.
    pub async fn set_as<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value, ttl).await,
            Err(e) => {
                tracing::warn!(key, error = %e, "Value not cacheable");
                false
            }
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.store.delete(key).await.unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "Cache delete failed");
            false
        })
    }

    pub async fn keys_matching(&self, pattern: &str) -> Vec<String> {
        self.store.keys_matching(pattern).await.unwrap_or_else(|e| {
            tracing::warn!(pattern, error = %e, "Cache key listing failed");
            Vec::new()
        })
    }

    pub async fn flush_all(&self) -> bool {
        match self.store.flush_all().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Cache flush failed");
                false
            }
        }
    }

    pub async fn ttl_remaining(&self, key: &str) -> TtlStatus {
        self.store.ttl_remaining(key).await.unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "Cache TTL lookup failed");
            TtlStatus::Missing
        })
    }

    pub async fn stats(&self) -> CacheStats {
        let keys = self.store.key_count().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Cache key count failed");
            0
        });
        CacheStats {
            backend: self.backend(),
            keys,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for CacheAside {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAside")
            .field("backend", &self.backend())
            .field("counters", &self.counters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::CacheError;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;

    /// Store whose every call fails, like a Redis that went away after startup.
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        fn backend(&self) -> CacheBackend {
            CacheBackend::Redis
        }
        async fn get(&self, _: &str) -> Result<Option<Value>, CacheError> {
            Err(CacheError::Unavailable("connection reset".into()))
        }
        async fn set(&self, _: &str, _: Value, _: Option<Duration>) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection reset".into()))
        }
        async fn delete(&self, _: &str) -> Result<bool, CacheError> {
            Err(CacheError::Unavailable("connection reset".into()))
        }
        async fn keys_matching(&self, _: &str) -> Result<Vec<String>, CacheError> {
            Err(CacheError::Unavailable("connection reset".into()))
        }
        async fn flush_all(&self) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection reset".into()))
        }
        async fn ttl_remaining(&self, _: &str) -> Result<TtlStatus, CacheError> {
            Err(CacheError::Unavailable("connection reset".into()))
        }
        async fn key_count(&self) -> Result<u64, CacheError> {
            Err(CacheError::Unavailable("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn store_errors_degrade_to_neutral_answers() {
        let cache = CacheAside::new(Arc::new(BrokenStore));

        assert_eq!(cache.get("k").await, None);
        assert!(!cache.set("k", json!(1), None).await);
        assert!(!cache.delete("k").await);
        assert!(cache.keys_matching("*").await.is_empty());
        assert!(!cache.flush_all().await);
        assert_eq!(cache.ttl_remaining("k").await, TtlStatus::Missing);

        let stats = cache.stats().await;
        assert_eq!(stats.backend, CacheBackend::Redis);
        assert_eq!(stats.keys, 0);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn stats_count_hits_and_misses() {
        let cache = CacheAside::in_memory();
        cache.set("a", json!(1), None).await;

        cache.get("a").await;
        cache.get("a").await;
        cache.get("b").await;

        let stats = cache.stats().await;
        assert_eq!(stats.backend, CacheBackend::Memory);
        assert_eq!(stats.keys, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[tokio::test]
    async fn typed_round_trip() {
        let cache = CacheAside::in_memory();
        assert!(cache.set_as("p", &Point { x: 1, y: 2 }, None).await);

        assert_eq!(cache.get_as::<Point>("p").await, Some(Point { x: 1, y: 2 }));
    }

    #[tokio::test]
    async fn typed_read_of_wrong_shape_is_a_miss() {
        let cache = CacheAside::in_memory();
        cache.set("p", json!("not a point"), None).await;

        assert_eq!(cache.get_as::<Point>("p").await, None);
    }

    #[tokio::test]
    async fn connect_falls_back_to_memory_when_redis_is_down() {
        let config = RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            timeout_secs: 1,
        };
        let cache = CacheAside::connect(&config).await;

        assert_eq!(cache.backend(), CacheBackend::Memory);
        assert!(cache.set("k", json!("v"), None).await);
        assert_eq!(cache.get("k").await, Some(json!("v")));
    }
}
