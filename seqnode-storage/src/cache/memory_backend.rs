//! In-process key-value store.
//!
//! Used for development, tests, and single-instance deployments where the
//! cache does not need to survive a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use seqnode_core::CacheError;
use tokio::sync::RwLock;

use super::traits::{CacheStats, HitCounters, KeyValueStore};

/// HashMap-backed store guarded by an async `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, String>>,
    counters: HitCounters,
    closed: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), CacheError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::transport("in-memory store is closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.ensure_open()?;
        let value = self.entries.read().await.get(key).cloned();
        match value {
            Some(_) => self.counters.record_hit(),
            None => self.counters.record_miss(),
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.ensure_open()?;
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, CacheError> {
        self.ensure_open()?;
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        self.ensure_open()?;
        let entry_count = self.entries.read().await.len() as u64;
        Ok(self.counters.snapshot(entry_count))
    }

    async fn close(&self) -> Result<(), CacheError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
