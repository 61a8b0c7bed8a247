//! In-process cache store.
//!
//! Used for tests, for local development, and as the fallback when Redis is
//! unreachable at startup. Expiry is lazy: an expired entry stays in the map
//! until something reads, lists, or counts it, at which point it is evicted
//! and reported as absent.
//!
//! Deadlines use `tokio::time::Instant` so tests can drive expiry with a
//! paused clock.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::ports::{CacheBackend, CacheError, CacheStore, TtlStatus};

use super::pattern::KeyPattern;

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Cache store backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every expired entry. Returns how many were evicted.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    fn backend(&self) -> CacheBackend {
        CacheBackend::Memory
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: evict, re-checking under the write lock in case a
        // concurrent set replaced the entry.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            tracing::trace!(key, "Evicted expired cache entry on read");
            return Ok(None);
        }
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError> {
        // A ttl past the clock's range never expires.
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.entries
            .write()
            .await
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let now = Instant::now();
        let removed = self.entries.write().await.remove(key);
        Ok(removed.is_some_and(|entry| !entry.is_expired(now)))
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let pattern = KeyPattern::new(pattern)?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.is_expired(now));

        let mut keys: Vec<String> = entries
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn ttl_remaining(&self, key: &str) -> Result<TtlStatus, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let status = match entries.get(key) {
            None => TtlStatus::Missing,
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                TtlStatus::Missing
            }
            Some(Entry {
                expires_at: None, ..
            }) => TtlStatus::Persistent,
            Some(Entry {
                expires_at: Some(deadline),
                ..
            }) => {
                // Round up like Redis does for sub-second remainders.
                let remaining = deadline.saturating_duration_since(now);
                let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                TtlStatus::ExpiresIn(secs)
            }
        };
        Ok(status)
    }

    async fn key_count(&self) -> Result<u64, CacheError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries.values().filter(|entry| !entry.is_expired(now)).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_returns_value() {
        let store = InMemoryCacheStore::new();
        store.set("k", json!({"a": 1}), None).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = InMemoryCacheStore::new();
        assert_eq!(store.get("nope").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_read_behaves_like_missing_and_evicts() {
        let store = InMemoryCacheStore::new();
        store
            .set("session", json!("x"), Some(Duration::from_secs(2)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("session").await.unwrap(), Some(json!("x")));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.get("session").await.unwrap(), None);
        assert_eq!(store.entries.read().await.len(), 0, "stale entry evicted");
        assert!(store.keys_matching("*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = InMemoryCacheStore::new();
        store.set("k", json!(1), None).await.unwrap();

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_of_expired_key_reports_false() {
        let store = InMemoryCacheStore::new();
        store.set("k", json!(1), Some(Duration::from_secs(1))).await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;

        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn keys_matching_filters_by_prefix() {
        let store = InMemoryCacheStore::new();
        for key in ["shipment_1", "shipment_2", "offer_1", "xshipment_3"] {
            store.set(key, json!(true), None).await.unwrap();
        }

        let keys = store.keys_matching("shipment_*").await.unwrap();
        assert_eq!(keys, vec!["shipment_1".to_string(), "shipment_2".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_remaining_reports_all_three_states() {
        let store = InMemoryCacheStore::new();
        store.set("forever", json!(1), None).await.unwrap();
        store
            .set("brief", json!(1), Some(Duration::from_secs(10)))
            .await
            .unwrap();

        assert_eq!(store.ttl_remaining("forever").await.unwrap(), TtlStatus::Persistent);
        assert_eq!(store.ttl_remaining("brief").await.unwrap(), TtlStatus::ExpiresIn(10));
        assert_eq!(store.ttl_remaining("absent").await.unwrap(), TtlStatus::Missing);

        tokio::time::advance(Duration::from_millis(3500)).await;
        assert_eq!(store.ttl_remaining("brief").await.unwrap(), TtlStatus::ExpiresIn(7));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(store.ttl_remaining("brief").await.unwrap(), TtlStatus::Missing);
    }

    #[tokio::test]
    async fn set_overwrites_and_clears_expiry() {
        let store = InMemoryCacheStore::new();
        store.set("k", json!(1), Some(Duration::from_secs(5))).await.unwrap();
        store.set("k", json!(2), None).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(json!(2)));
        assert_eq!(store.ttl_remaining("k").await.unwrap(), TtlStatus::Persistent);
    }

    #[tokio::test]
    async fn ttl_beyond_clock_range_never_expires() {
        let store = InMemoryCacheStore::new();
        store
            .set("k", json!(1), Some(Duration::from_secs(u64::MAX)))
            .await
            .unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(json!(1)));
        assert_eq!(store.ttl_remaining("k").await.unwrap(), TtlStatus::Persistent);
    }

    #[tokio::test]
    async fn flush_all_empties_store() {
        let store = InMemoryCacheStore::new();
        store.set("a", json!(1), None).await.unwrap();
        store.set("b", json!(2), None).await.unwrap();

        store.flush_all().await.unwrap();

        assert_eq!(store.key_count().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_expired_counts_evictions() {
        let store = InMemoryCacheStore::new();
        store.set("a", json!(1), Some(Duration::from_secs(1))).await.unwrap();
        store.set("b", json!(1), None).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(store.key_count().await.unwrap(), 1);
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.entries.read().await.len(), 1);
    }
}
