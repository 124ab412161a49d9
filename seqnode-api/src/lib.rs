//! Seqnode API - Sequence Node Retrieval and Caching
//!
//! This crate provides the read-through sequence node provider and a thin
//! Axum REST layer over it. The provider derives a stable key for an
//! identifier, serves from the shared cache when it can, and otherwise
//! validates the identifier, fetches from the authoritative upstream and
//! populates the cache.

pub mod config;
pub mod error;
pub mod merge;
pub mod provider;
pub mod routes;
pub mod store;
pub mod telemetry;
pub mod upstream;
pub mod validation;

// Re-export commonly used types
pub use config::{CacheBackendKind, MergePolicyKind, ProviderConfig, ServerConfig, StatusPolicy, StoreConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use merge::{merge_patch, KeepExisting, MergePatch, MergePolicy, ReplaceContent};
pub use provider::{CachedSequenceNode, SequenceNodeProvider};
pub use routes::create_api_router;
pub use store::open_store;
pub use upstream::{HttpUpstreamClient, UpstreamClient, UpstreamRequest};
pub use validation::IdentifierValidator;
