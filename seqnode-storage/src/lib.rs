//! Seqnode Storage - Cache Store Abstraction and Backends
//!
//! Defines the key-value store contract the provider caches through, the
//! in-memory and LMDB backends, and the typed sequence node cache adapter.

pub mod cache;

pub use cache::{
    CacheLookup, CacheStats, InMemoryStore, KeyValueStore, LmdbCacheError, LmdbStore,
    NamespacedKey, SequenceNodeCache, DEFAULT_KEY_PREFIX,
};
