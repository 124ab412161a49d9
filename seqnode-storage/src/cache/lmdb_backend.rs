//! LMDB-backed key-value store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a persistent,
//! memory-mapped store that survives process restarts and can be shared by
//! several processes on one host.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The backend uses:
//! - Read transactions for `get` and `stats`
//! - Write transactions for `set` and `del`
//!
//! Every transaction runs on tokio's blocking pool so async callers never
//! stall a worker thread on disk I/O.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use heed::types::Str;
use heed::{Database, Env, EnvOpenOptions};
use seqnode_core::CacheError;

use super::traits::{CacheStats, HitCounters, KeyValueStore};

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Blocking task panicked or was cancelled.
    #[error("Blocking task failed: {0}")]
    Join(String),

    /// The store was closed.
    #[error("LMDB store is closed")]
    Closed,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for CacheError {
    fn from(e: LmdbCacheError) -> Self {
        CacheError::transport(e)
    }
}

/// LMDB-backed key-value store.
///
/// # Example
///
/// ```ignore
/// use seqnode_storage::LmdbStore;
///
/// let store = LmdbStore::open("/var/lib/seqnode/cache", 256)?;
/// store.set("SEQN:...", entry_json).await?;
/// ```
pub struct LmdbStore {
    env: Env,
    db: Database<Str, Str>,
    counters: Arc<HitCounters>,
    closed: AtomicBool,
}

impl LmdbStore {
    /// Open (or create) an LMDB store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        let map_size = max_size_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| {
                LmdbCacheError::EnvOpen(format!("map size of {} MB overflows", max_size_mb))
            })?;
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per path by this process
        // and never with conflicting flags.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Str, Str> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            counters: Arc::new(HitCounters::default()),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), LmdbCacheError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LmdbCacheError::Closed);
        }
        Ok(())
    }

    /// Run a closure against the environment on the blocking pool.
    async fn with_env<T, F>(&self, f: F) -> Result<T, LmdbCacheError>
    where
        T: Send + 'static,
        F: FnOnce(&Env, Database<Str, Str>) -> Result<T, LmdbCacheError> + Send + 'static,
    {
        self.ensure_open()?;
        let env = self.env.clone();
        let db = self.db;
        tokio::task::spawn_blocking(move || f(&env, db))
            .await
            .map_err(|e| LmdbCacheError::Join(e.to_string()))?
    }
}

#[async_trait]
impl KeyValueStore for LmdbStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let key = key.to_string();
        let value = self
            .with_env(move |env, db| {
                let rtxn = env
                    .read_txn()
                    .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
                let value = db
                    .get(&rtxn, &key)
                    .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
                Ok(value.map(str::to_string))
            })
            .await?;

        match value {
            Some(_) => self.counters.record_hit(),
            None => self.counters.record_miss(),
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let key = key.to_string();
        self.with_env(move |env, db| {
            let mut wtxn = env
                .write_txn()
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
            db.put(&mut wtxn, &key, &value)
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
            wtxn.commit()
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))
        })
        .await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, CacheError> {
        let key = key.to_string();
        let deleted = self
            .with_env(move |env, db| {
                let mut wtxn = env
                    .write_txn()
                    .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
                let deleted = db
                    .delete(&mut wtxn, &key)
                    .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
                wtxn.commit()
                    .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
                Ok(deleted)
            })
            .await?;
        Ok(deleted)
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let entry_count = self
            .with_env(|env, db| {
                let rtxn = env
                    .read_txn()
                    .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
                db.len(&rtxn)
                    .map_err(|e| LmdbCacheError::Transaction(e.to_string()))
            })
            .await?;
        Ok(self.counters.snapshot(entry_count))
    }

    async fn close(&self) -> Result<(), CacheError> {
        let flushed = self
            .with_env(|env, _db| {
                env.force_sync()
                    .map_err(|e| LmdbCacheError::Transaction(e.to_string()))
            })
            .await;
        self.closed.store(true, Ordering::Release);
        flushed.map_err(CacheError::from)
    }

    fn backend_name(&self) -> &'static str {
        "lmdb"
    }
}
