//! Cache store construction from configuration.

use std::sync::Arc;

use seqnode_storage::{InMemoryStore, KeyValueStore, LmdbStore};

use crate::config::{CacheBackendKind, StoreConfig};
use crate::error::{ApiError, ApiResult};

/// Open the configured backend. The caller owns its lifecycle and must
/// close it at shutdown.
pub fn open_store(config: &StoreConfig) -> ApiResult<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.backend {
        CacheBackendKind::Memory => Arc::new(InMemoryStore::new()),
        CacheBackendKind::Lmdb => {
            let store = LmdbStore::open(&config.path, config.max_size_mb).map_err(|e| {
                ApiError::service_unavailable(format!(
                    "Failed to open LMDB cache at {}: {}",
                    config.path.display(),
                    e
                ))
            })?;
            Arc::new(store)
        }
    };

    tracing::info!(
        backend = %config.backend,
        path = %config.path.display(),
        "Cache store opened"
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory_store() {
        let store = open_store(&StoreConfig::default()).expect("memory store opens");
        assert_eq!(store.backend_name(), "memory");
    }

    #[test]
    fn test_open_lmdb_store() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let config = StoreConfig {
            backend: CacheBackendKind::Lmdb,
            path: dir.path().join("cache"),
            max_size_mb: 8,
        };
        let store = open_store(&config).expect("lmdb store opens");
        assert_eq!(store.backend_name(), "lmdb");
    }
}
