//! Sequence node provider.
//!
//! Composes key derivation, the cache adapter, validation and the upstream
//! client into the read-through protocol:
//!
//! ```text
//! derive key -> cache lookup -> hit:  return cached content
//!                            -> miss: validate -> fetch -> store (best effort) -> return
//! ```
//!
//! Cache failures on the identifier path are logged and treated as misses
//! (reads) or swallowed (writes). The by-key, update and evict paths are
//! explicit cache operations and surface cache failures.

use std::sync::Arc;

use dashmap::DashMap;
use seqnode_core::{
    CacheEntry, FieldViolation, RetrievalResult, SeqnError, SeqnResult, SequenceNodeIdentifier,
    SequenceNodeKey, ValidationError,
};
use seqnode_storage::{CacheLookup, CacheStats, KeyValueStore, SequenceNodeCache};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::ProviderConfig;
use crate::error::ApiResult;
use crate::merge::{policy_for, MergePolicy};
use crate::upstream::{UpstreamClient, UpstreamRequest};
use crate::validation::IdentifierValidator;

/// A cached sequence node as returned by key lookups and updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSequenceNode {
    pub sequence_node_key: SequenceNodeKey,
    pub hub_session: Option<String>,
    pub sequence_node_content: Value,
}

impl CachedSequenceNode {
    fn from_entry(key: SequenceNodeKey, entry: CacheEntry) -> Self {
        let hub_session = entry.hub_session().map(str::to_string);
        Self {
            sequence_node_key: key,
            hub_session,
            sequence_node_content: entry.into_content(),
        }
    }
}

/// Per-key async locks. Entries are dropped once no task holds or awaits them.
#[derive(Default)]
struct KeyLocks {
    locks: DashMap<SequenceNodeKey, Arc<Mutex<()>>>,
}

impl KeyLocks {
    fn lock_for(&self, key: &SequenceNodeKey) -> Arc<Mutex<()>> {
        self.locks.entry(key.clone()).or_default().clone()
    }

    /// Wait for exclusive use of `key`. The entry is released when the
    /// lease drops, including when the waiting future is cancelled.
    async fn acquire(&self, key: &SequenceNodeKey) -> KeyLease<'_> {
        let mut lease = KeyLease {
            locks: self,
            key: key.clone(),
            lock: self.lock_for(key),
            held: None,
        };
        lease.held = Some(lease.lock.clone().lock_owned().await);
        lease
    }

    fn release(&self, key: &SequenceNodeKey, lock: &Arc<Mutex<()>>) {
        // Map + this handle: nobody else is waiting
        self.locks
            .remove_if(key, |_, held| Arc::ptr_eq(held, lock) && Arc::strong_count(held) <= 2);
    }

    fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Exclusive hold on one key's lock.
struct KeyLease<'a> {
    locks: &'a KeyLocks,
    key: SequenceNodeKey,
    lock: Arc<Mutex<()>>,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyLease<'_> {
    fn drop(&mut self) {
        // Unlock first so the guard's handle does not count as a waiter
        self.held.take();
        self.locks.release(&self.key, &self.lock);
    }
}

/// Read-through sequence node provider.
pub struct SequenceNodeProvider {
    cache: SequenceNodeCache,
    upstream: Arc<dyn UpstreamClient>,
    validator: IdentifierValidator,
    merge_policy: Box<dyn MergePolicy>,
    default_upstream_url: Option<String>,
    coalesce_misses: bool,
    key_locks: KeyLocks,
}

impl SequenceNodeProvider {
    /// Build a provider over an already opened store.
    pub fn new(
        config: &ProviderConfig,
        store: Arc<dyn KeyValueStore>,
        upstream: Arc<dyn UpstreamClient>,
    ) -> ApiResult<Self> {
        let validator = IdentifierValidator::new(config.default_upstream_url.is_none())?;
        Ok(Self {
            cache: SequenceNodeCache::with_prefix(store, config.key_prefix.clone()),
            upstream,
            validator,
            merge_policy: policy_for(config.merge_policy),
            default_upstream_url: config.default_upstream_url.clone(),
            coalesce_misses: config.coalesce_misses,
            key_locks: KeyLocks::default(),
        })
    }

    /// Replace the configured merge policy.
    pub fn with_merge_policy(mut self, policy: Box<dyn MergePolicy>) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn validator(&self) -> &IdentifierValidator {
        &self.validator
    }

    pub fn cache(&self) -> &SequenceNodeCache {
        &self.cache
    }

    pub fn merge_policy_name(&self) -> &'static str {
        self.merge_policy.name()
    }

    /// Derive the cache key for an identifier without touching the cache.
    pub fn obtain_sequence_node_key(
        &self,
        identifier: &SequenceNodeIdentifier,
    ) -> SeqnResult<SequenceNodeKey> {
        SequenceNodeKey::derive(identifier)
    }

    /// Serve from cache, or fetch from upstream and populate the cache.
    pub async fn get_sequence_node(
        &self,
        identifier: &SequenceNodeIdentifier,
    ) -> SeqnResult<RetrievalResult> {
        let key = self.obtain_sequence_node_key(identifier)?;

        if let Some(entry) = self.cached_or_miss(&key).await {
            return Ok(hit_result(key, entry));
        }

        if !self.coalesce_misses {
            return self.fetch_and_populate(identifier, key).await;
        }

        let _lease = self.key_locks.acquire(&key).await;
        // Another caller may have filled the entry while we waited
        match self.cached_or_miss(&key).await {
            Some(entry) => Ok(hit_result(key, entry)),
            None => self.fetch_and_populate(identifier, key).await,
        }
    }

    /// Read a previously cached node. Never calls upstream.
    pub async fn get_sequence_node_by_key(&self, key: &str) -> SeqnResult<CachedSequenceNode> {
        let key = SequenceNodeKey::parse(key)?;
        match self.cache.lookup(&key).await? {
            CacheLookup::Hit(entry) => Ok(CachedSequenceNode::from_entry(key, entry)),
            CacheLookup::Miss => Err(SeqnError::NotFound {
                key: key.into_string(),
            }),
        }
    }

    /// Read-modify-write the entry under `key` with the merge policy.
    ///
    /// Returns the entry as stored after the update. With a policy that
    /// declines to merge, that is the existing entry and nothing is written.
    pub async fn update_sequence_node_in_cache(
        &self,
        key: &str,
        data: Value,
    ) -> SeqnResult<CachedSequenceNode> {
        let key = SequenceNodeKey::parse(key)?;
        let lease = self.key_locks.acquire(&key).await;
        let result = self.merge_under_lock(&key, &data).await;
        drop(lease);
        result.map(|entry| CachedSequenceNode::from_entry(key, entry))
    }

    /// Remove the entry under `key`. Returns whether one was present.
    pub async fn evict_sequence_node(&self, key: &str) -> SeqnResult<bool> {
        let key = SequenceNodeKey::parse(key)?;
        let removed = self.cache.evict(&key).await?;
        tracing::info!(key = %key, removed, "Evicted sequence node");
        Ok(removed)
    }

    pub async fn cache_stats(&self) -> SeqnResult<CacheStats> {
        Ok(self.cache.stats().await?)
    }

    /// Close the underlying store. Call once at shutdown.
    pub async fn close(&self) -> SeqnResult<()> {
        self.cache.close().await?;
        tracing::info!(backend = self.cache.backend_name(), "Cache store closed");
        Ok(())
    }

    /// Number of keys with a pending coalesced fetch or update.
    pub fn in_flight_keys(&self) -> usize {
        self.key_locks.len()
    }

    async fn cached_or_miss(&self, key: &SequenceNodeKey) -> Option<CacheEntry> {
        match self.cache.lookup(key).await {
            Ok(lookup) => lookup.into_entry(),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, falling back to upstream");
                None
            }
        }
    }

    async fn fetch_and_populate(
        &self,
        identifier: &SequenceNodeIdentifier,
        key: SequenceNodeKey,
    ) -> SeqnResult<RetrievalResult> {
        self.validator.validate(identifier)?;
        let request = self.upstream_request(identifier)?;

        let data = self.upstream.fetch(request).await.map_err(|e| {
            tracing::warn!(key = %key, status = e.status_code, error = %e, "Upstream fetch failed");
            e
        })?;

        let entry = CacheEntry::new(identifier.hub_session().map(str::to_string), data.clone())?;
        match self.cache.store_entry(&key, &entry).await {
            Ok(()) => tracing::info!(key = %key, "Fetched and cached sequence node"),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache write failed, returning uncached content")
            }
        }

        Ok(RetrievalResult {
            sequence_node_key: key,
            sequence_node_content: data,
            from_cache: false,
        })
    }

    fn upstream_request(&self, identifier: &SequenceNodeIdentifier) -> SeqnResult<UpstreamRequest> {
        let mut violations = Vec::new();

        let url = identifier
            .url
            .clone()
            .or_else(|| self.default_upstream_url.clone());
        if url.is_none() {
            violations.push(FieldViolation::new("/url", "is required"));
        }
        let method = identifier.http_method();
        if method.is_none() {
            violations.push(FieldViolation::new("/method", "must be \"GET\" or \"POST\""));
        }

        match (url, method) {
            (Some(url), Some(method)) => Ok(UpstreamRequest {
                method,
                url,
                headers: identifier.header.clone().unwrap_or_default(),
                body: identifier.content.clone().unwrap_or(Value::Null),
            }),
            _ => Err(ValidationError::new(violations).into()),
        }
    }

    async fn merge_under_lock(&self, key: &SequenceNodeKey, data: &Value) -> SeqnResult<CacheEntry> {
        let existing = match self.cache.lookup(key).await? {
            CacheLookup::Hit(entry) => entry,
            CacheLookup::Miss => {
                return Err(SeqnError::NotFound {
                    key: key.to_string(),
                })
            }
        };

        match self.merge_policy.merge(&existing, data)? {
            Some(updated) => {
                self.cache.store_entry(key, &updated).await?;
                tracing::info!(key = %key, policy = self.merge_policy.name(), "Updated cached sequence node");
                Ok(updated)
            }
            None => {
                tracing::debug!(key = %key, policy = self.merge_policy.name(), "Merge policy kept existing entry");
                Ok(existing)
            }
        }
    }
}

fn hit_result(key: SequenceNodeKey, entry: CacheEntry) -> RetrievalResult {
    tracing::debug!(key = %key, "Serving sequence node from cache");
    RetrievalResult {
        sequence_node_key: key,
        sequence_node_content: entry.into_content(),
        from_cache: true,
    }
}

impl std::fmt::Debug for SequenceNodeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceNodeProvider")
            .field("cache", &self.cache)
            .field("merge_policy", &self.merge_policy.name())
            .field("default_upstream_url", &self.default_upstream_url)
            .field("coalesce_misses", &self.coalesce_misses)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use seqnode_core::{HttpMethod, UpstreamError};
    use seqnode_storage::InMemoryStore;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Mutex as StdMutex;

    /// Records requests and answers with a fixed body.
    struct RecordingUpstream {
        body: Value,
        requests: StdMutex<Vec<UpstreamRequest>>,
    }

    #[async_trait]
    impl UpstreamClient for RecordingUpstream {
        async fn fetch(&self, request: UpstreamRequest) -> Result<Value, UpstreamError> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request);
            }
            Ok(self.body.clone())
        }
    }

    fn identifier(url: Option<&str>) -> SequenceNodeIdentifier {
        let mut header = BTreeMap::new();
        header.insert("hub-session".to_string(), "hub-9".to_string());
        SequenceNodeIdentifier {
            header: Some(header),
            content: Some(json!({
                "@context": "ctx",
                "@type": "SequenceNode",
                "targetBinding": "tb"
            })),
            url: url.map(str::to_string),
            method: Some(HttpMethod::Get.as_str().to_string()),
        }
    }

    fn provider(config: &ProviderConfig) -> (SequenceNodeProvider, Arc<RecordingUpstream>) {
        let upstream = Arc::new(RecordingUpstream {
            body: json!({"foo": "bar"}),
            requests: StdMutex::new(Vec::new()),
        });
        let provider = SequenceNodeProvider::new(config, Arc::new(InMemoryStore::new()), upstream.clone())
            .expect("provider builds");
        (provider, upstream)
    }

    #[tokio::test]
    async fn test_default_url_is_used_when_identifier_has_none() {
        let config = ProviderConfig::default().with_default_upstream_url("https://default.example/seq");
        let (provider, upstream) = provider(&config);

        provider
            .get_sequence_node(&identifier(None))
            .await
            .expect("retrieval succeeds");

        let requests = upstream.requests.lock().expect("lock");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://default.example/seq");
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].body["targetBinding"], "tb");
    }

    #[tokio::test]
    async fn test_identifier_url_wins_over_default() {
        let config = ProviderConfig::default().with_default_upstream_url("https://default.example/seq");
        let (provider, upstream) = provider(&config);

        provider
            .get_sequence_node(&identifier(Some("https://own.example/seq")))
            .await
            .expect("retrieval succeeds");

        let requests = upstream.requests.lock().expect("lock");
        assert_eq!(requests[0].url, "https://own.example/seq");
    }

    #[tokio::test]
    async fn test_missing_url_without_default_is_validation_error() {
        let (provider, upstream) = provider(&ProviderConfig::default());

        let err = provider
            .get_sequence_node(&identifier(None))
            .await
            .expect_err("url required");

        match err {
            SeqnError::Validation(v) => assert_eq!(v.fields(), vec!["/url"]),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(upstream.requests.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn test_key_locks_are_released() {
        let config = ProviderConfig::default().with_coalesce_misses(true);
        let (provider, _upstream) = provider(&config);
        let id = identifier(Some("https://own.example/seq"));

        provider.get_sequence_node(&id).await.expect("retrieval succeeds");
        let key = provider.obtain_sequence_node_key(&id).expect("key derives");
        provider
            .update_sequence_node_in_cache(key.as_str(), json!({"x": 1}))
            .await
            .expect("update succeeds");

        assert_eq!(provider.in_flight_keys(), 0);
    }

    #[test]
    fn test_key_locks_release_only_unshared() {
        let locks = KeyLocks::default();
        let key = SequenceNodeKey::parse(&"a".repeat(32)).expect("valid key");

        let first = locks.lock_for(&key);
        let second = locks.lock_for(&key);
        assert!(Arc::ptr_eq(&first, &second));

        locks.release(&key, &first);
        assert_eq!(locks.len(), 1);
        drop(first);
        locks.release(&key, &second);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_lease_releases_entry() {
        let locks = KeyLocks::default();
        let key = SequenceNodeKey::parse(&"b".repeat(32)).expect("valid key");

        let held = locks.acquire(&key).await;
        {
            // Waits behind `held` and is dropped before it gets the lock
            let waiting = locks.acquire(&key);
            let timed_out =
                tokio::time::timeout(std::time::Duration::from_millis(20), waiting).await;
            assert!(timed_out.is_err());
        }
        assert_eq!(locks.len(), 1);

        drop(held);
        assert_eq!(locks.len(), 0);
    }
}
