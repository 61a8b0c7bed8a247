//! Cache Store Port - key/value storage with optional expiry.
//!
//! Implemented by Redis for production and by an in-process map for
//! development, tests, and as the fallback when Redis is unreachable at
//! startup. Both implementations must be observably identical, including
//! lazy expiry: reading an expired key behaves exactly like reading a key
//! that was never set, and evicts it.
//!
//! Stores surface every failure. Swallowing them is the job of the
//! `CacheAside` façade, which callers use.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Errors that can occur in cache store operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// The backing store could not be reached or rejected the command.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    Serialization(String),

    /// The key pattern could not be compiled.
    #[error("Invalid key pattern: {0}")]
    InvalidPattern(String),
}

/// Remaining lifetime of a key, with Redis `TTL` semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    /// Key exists and expires in this many whole seconds.
    ExpiresIn(u64),
    /// Key exists and never expires.
    Persistent,
    /// Key does not exist (or has expired).
    Missing,
}

impl TtlStatus {
    /// `seconds`, `-1` for no expiry, `-2` for absent.
    pub fn as_seconds(&self) -> i64 {
        match self {
            TtlStatus::ExpiresIn(secs) => *secs as i64,
            TtlStatus::Persistent => -1,
            TtlStatus::Missing => -2,
        }
    }

    /// Inverse of [`TtlStatus::as_seconds`].
    pub fn from_seconds(secs: i64) -> Self {
        match secs {
            -1 => TtlStatus::Persistent,
            s if s < 0 => TtlStatus::Missing,
            s => TtlStatus::ExpiresIn(s as u64),
        }
    }
}

/// Which backend is serving cache calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

/// Point-in-time statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub backend: CacheBackend,
    pub keys: u64,
    pub hits: u64,
    pub misses: u64,
}

/// Port for a key/value cache.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Which backend this is.
    fn backend(&self) -> CacheBackend;

    /// Value for `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Store `value`; `ttl = None` means no expiry.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Remove `key`; `true` if it existed and had not expired.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Live keys matching a glob where only `*` is special.
    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Remove every key.
    async fn flush_all(&self) -> Result<(), CacheError>;

    /// Remaining lifetime of `key`.
    async fn ttl_remaining(&self, key: &str) -> Result<TtlStatus, CacheError>;

    /// Number of live keys.
    async fn key_count(&self) -> Result<u64, CacheError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_status_seconds_mapping() {
        assert_eq!(TtlStatus::ExpiresIn(30).as_seconds(), 30);
        assert_eq!(TtlStatus::Persistent.as_seconds(), -1);
        assert_eq!(TtlStatus::Missing.as_seconds(), -2);
    }

    #[test]
    fn ttl_status_from_redis_replies() {
        assert_eq!(TtlStatus::from_seconds(12), TtlStatus::ExpiresIn(12));
        assert_eq!(TtlStatus::from_seconds(0), TtlStatus::ExpiresIn(0));
        assert_eq!(TtlStatus::from_seconds(-1), TtlStatus::Persistent);
        assert_eq!(TtlStatus::from_seconds(-2), TtlStatus::Missing);
    }

    #[test]
    fn cache_stats_serializes_camel_case() {
        let stats = CacheStats {
            backend: CacheBackend::Memory,
            keys: 3,
            hits: 5,
            misses: 1,
        };
        assert_eq!(
            serde_json::to_value(&stats).unwrap(),
            serde_json::json!({"backend": "memory", "keys": 3, "hits": 5, "misses": 1})
        );
    }

    #[test]
    fn cache_store_trait_is_object_safe() {
        fn _assert(_: &dyn CacheStore) {}
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn CacheStore>();
    }
}
