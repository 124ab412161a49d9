//! REST API Routes Module
//!
//! - `/sequence-node` - retrieval, key derivation, by-key read, update, evict
//! - `/health` - liveness and readiness

pub mod health;
pub mod sequence_node;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::provider::SequenceNodeProvider;

/// Create the full API router with request tracing.
pub fn create_api_router(provider: Arc<SequenceNodeProvider>) -> Router {
    Router::new()
        .nest("/sequence-node", sequence_node::create_router(provider.clone()))
        .nest("/health", health::create_router(provider))
        .layer(TraceLayer::new_for_http())
}
