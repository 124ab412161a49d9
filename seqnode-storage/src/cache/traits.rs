//! Key-value store trait and cache statistics.
//!
//! This module defines the raw get/set/del contract every cache backend
//! implements. Values are opaque strings at this level; the typed adapter
//! in [`super::sequence_cache`] owns the wire format.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use seqnode_core::CacheError;

/// Key-value store backend for pluggable cache implementations.
///
/// This trait abstracts over different backends (in-memory, LMDB). A
/// backend is a long-lived shared resource: it is opened once at startup,
/// shared through an `Arc`, and closed at shutdown. Implementations must
/// be safe for concurrent use.
///
/// # Outcomes
///
/// `get` distinguishes an absent key (`Ok(None)`) from an unreachable store
/// (`Err(CacheError::Transport)`). Writes are idempotent upserts.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the raw value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;

    /// Delete `key`. Returns whether a value was present.
    async fn del(&self, key: &str) -> Result<bool, CacheError>;

    /// Get cache statistics.
    async fn stats(&self) -> Result<CacheStats, CacheError>;

    /// Flush and release the backend. Later operations fail with a
    /// transport error.
    async fn close(&self) -> Result<(), CacheError> {
        Ok(())
    }

    /// Short backend name for logs and health output.
    fn backend_name(&self) -> &'static str;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Lock-free hit/miss counters shared by the backends.
#[derive(Debug, Default)]
pub(crate) struct HitCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl HitCounters {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, entry_count: u64) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
        }
    }
}
