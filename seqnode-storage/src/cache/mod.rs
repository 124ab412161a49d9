//! Sequence node cache layer.
//!
//! Two levels:
//!
//! - [`KeyValueStore`]: raw get/set/del of strings. Backends are
//!   [`InMemoryStore`] for tests and single-instance use and [`LmdbStore`]
//!   for a persistent store shared across processes on one host.
//! - [`SequenceNodeCache`]: the typed adapter. It namespaces every key with
//!   a prefix (`SEQN:` by default) and owns the entry wire format.
//!
//! # Example
//!
//! ```ignore
//! let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
//! let cache = SequenceNodeCache::new(store);
//!
//! match cache.lookup(&key).await? {
//!     CacheLookup::Hit(entry) => serve(entry.into_content()),
//!     CacheLookup::Miss => fetch_upstream().await?,
//! }
//! ```

pub mod lmdb_backend;
pub mod memory_backend;
pub mod namespaced_key;
pub mod sequence_cache;
pub mod traits;

pub use lmdb_backend::{LmdbCacheError, LmdbStore};
pub use memory_backend::InMemoryStore;
pub use namespaced_key::{NamespacedKey, DEFAULT_KEY_PREFIX};
pub use sequence_cache::{CacheLookup, SequenceNodeCache};
pub use traits::{CacheStats, KeyValueStore};
