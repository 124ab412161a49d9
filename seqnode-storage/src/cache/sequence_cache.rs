//! Typed cache adapter for sequence node entries.
//!
//! Sits between the provider and a raw [`KeyValueStore`]: it namespaces
//! keys, encodes [`CacheEntry`] values as JSON text and decodes them on the
//! way out. Backends never see an unprefixed key or a typed value.

use std::sync::Arc;

use seqnode_core::{CacheEntry, CacheError, SequenceNodeKey};
use tracing::{debug, warn};

use super::namespaced_key::{NamespacedKey, DEFAULT_KEY_PREFIX};
use super::traits::{CacheStats, KeyValueStore};

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(CacheEntry),
    Miss,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    pub fn into_entry(self) -> Option<CacheEntry> {
        match self {
            CacheLookup::Hit(entry) => Some(entry),
            CacheLookup::Miss => None,
        }
    }
}

/// Sequence node cache over a shared key-value store.
#[derive(Clone)]
pub struct SequenceNodeCache {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl SequenceNodeCache {
    /// Create a cache using the default `SEQN:` namespace.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_prefix(store, DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix(store: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// The store key a sequence node key maps to.
    pub fn namespaced(&self, key: &SequenceNodeKey) -> NamespacedKey {
        NamespacedKey::new(self.prefix.clone(), key.clone())
    }

    /// Look up the entry for `key`.
    ///
    /// A value that cannot be decoded is reported as [`CacheError::Corrupt`]
    /// rather than treated as a miss.
    pub async fn lookup(&self, key: &SequenceNodeKey) -> Result<CacheLookup, CacheError> {
        let store_key = self.namespaced(key).encode();
        let Some(raw) = self.store.get(&store_key).await? else {
            debug!(key = %store_key, "Sequence node cache miss");
            return Ok(CacheLookup::Miss);
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => {
                debug!(key = %store_key, "Sequence node cache hit");
                Ok(CacheLookup::Hit(entry))
            }
            Err(e) => {
                warn!(key = %store_key, error = %e, "Undecodable sequence node cache entry");
                Err(CacheError::Corrupt {
                    key: store_key,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Write `entry` under `key`, replacing whatever was there.
    pub async fn store_entry(
        &self,
        key: &SequenceNodeKey,
        entry: &CacheEntry,
    ) -> Result<(), CacheError> {
        let store_key = self.namespaced(key).encode();
        let raw = serde_json::to_string(entry).map_err(|e| CacheError::Corrupt {
            key: store_key.clone(),
            reason: e.to_string(),
        })?;
        self.store.set(&store_key, raw).await?;
        debug!(key = %store_key, "Stored sequence node cache entry");
        Ok(())
    }

    /// Remove the entry for `key`. Returns whether one was present.
    pub async fn evict(&self, key: &SequenceNodeKey) -> Result<bool, CacheError> {
        let store_key = self.namespaced(key).encode();
        let removed = self.store.del(&store_key).await?;
        debug!(key = %store_key, removed, "Evicted sequence node cache entry");
        Ok(removed)
    }

    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        self.store.stats().await
    }

    /// Close the underlying store.
    pub async fn close(&self) -> Result<(), CacheError> {
        self.store.close().await
    }
}

impl std::fmt::Debug for SequenceNodeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceNodeCache")
            .field("backend", &self.store.backend_name())
            .field("prefix", &self.prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory_backend::InMemoryStore;
    use serde_json::json;

    fn key(c: char) -> SequenceNodeKey {
        SequenceNodeKey::parse(&c.to_string().repeat(32)).expect("valid key")
    }

    fn cache() -> (SequenceNodeCache, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (SequenceNodeCache::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_lookup_miss_then_hit() {
        let (cache, _store) = cache();
        let k = key('a');
        assert_eq!(cache.lookup(&k).await.expect("lookup"), CacheLookup::Miss);

        let entry = CacheEntry::new(Some("hub-1".into()), json!({"foo": "bar"})).expect("entry");
        cache.store_entry(&k, &entry).await.expect("store");

        let found = cache.lookup(&k).await.expect("lookup");
        assert_eq!(found, CacheLookup::Hit(entry));
    }

    #[tokio::test]
    async fn test_entries_are_written_under_prefix() {
        let (cache, store) = cache();
        let k = key('b');
        let entry = CacheEntry::new(None, json!({"foo": "bar"})).expect("entry");
        cache.store_entry(&k, &entry).await.expect("store");

        let raw = store
            .get(&format!("SEQN:{}", k))
            .await
            .expect("get")
            .expect("entry present under prefix");
        let wire: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(wire, json!({"hubSession": null, "sequenceNodeContent": {"foo": "bar"}}));
        assert!(store.get(k.as_str()).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_custom_prefix_isolates_namespaces() {
        let store: Arc<InMemoryStore> = Arc::new(InMemoryStore::new());
        let a = SequenceNodeCache::with_prefix(store.clone(), "A:");
        let b = SequenceNodeCache::with_prefix(store.clone(), "B:");
        let k = key('c');
        let entry = CacheEntry::new(None, json!({"v": 1})).expect("entry");
        a.store_entry(&k, &entry).await.expect("store");

        assert!(a.lookup(&k).await.expect("lookup").is_hit());
        assert!(!b.lookup(&k).await.expect("lookup").is_hit());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_reported() {
        let (cache, store) = cache();
        let k = key('d');
        store
            .set(&cache.namespaced(&k).encode(), "{\"hubSession\":\"x\"}".to_string())
            .await
            .expect("set");

        let err = cache.lookup(&k).await.expect_err("corrupt entry");
        assert!(matches!(err, CacheError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_evict() {
        let (cache, _store) = cache();
        let k = key('e');
        let entry = CacheEntry::new(None, json!({"v": 1})).expect("entry");
        cache.store_entry(&k, &entry).await.expect("store");

        assert!(cache.evict(&k).await.expect("evict"));
        assert!(!cache.evict(&k).await.expect("evict"));
        assert_eq!(cache.lookup(&k).await.expect("lookup"), CacheLookup::Miss);
    }
}
