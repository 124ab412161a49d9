//! Sequence Node REST API Routes
//!
//! Thin handlers over [`SequenceNodeProvider`]. Request bodies are taken as
//! raw JSON so a malformed envelope is reported field by field instead of
//! as a generic deserialization failure.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use seqnode_core::{SeqnError, SequenceNodeIdentifier, SequenceNodeKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::provider::SequenceNodeProvider;

// ============================================================================
// TYPES
// ============================================================================

/// Response for `POST /sequence-node/key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceNodeKeyResponse {
    pub sequence_node_key: SequenceNodeKey,
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone)]
pub struct SequenceNodeState {
    pub provider: Arc<SequenceNodeProvider>,
}

// ============================================================================
// HELPERS
// ============================================================================

fn json_body(payload: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::invalid_input(rejection.body_text()))
}

/// Decode an identifier envelope. Shape errors are reported by the validator.
fn decode_identifier(
    provider: &SequenceNodeProvider,
    body: Value,
) -> ApiResult<SequenceNodeIdentifier> {
    match serde_json::from_value::<SequenceNodeIdentifier>(body.clone()) {
        Ok(identifier) => Ok(identifier),
        Err(decode_err) => match provider.validator().validate_value(&body) {
            Err(violations) => Err(SeqnError::from(violations).into()),
            Ok(()) => Err(decode_err.into()),
        },
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /sequence-node - Retrieve a sequence node, from cache or upstream
pub async fn get_sequence_node(
    State(state): State<SequenceNodeState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let identifier = decode_identifier(&state.provider, json_body(payload)?)?;
    let result = state.provider.get_sequence_node(&identifier).await?;
    Ok(Json(result))
}

/// POST /sequence-node/key - Derive the cache key for an identifier
pub async fn obtain_sequence_node_key(
    State(state): State<SequenceNodeState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let identifier = decode_identifier(&state.provider, json_body(payload)?)?;
    let sequence_node_key = state.provider.obtain_sequence_node_key(&identifier)?;
    Ok(Json(SequenceNodeKeyResponse { sequence_node_key }))
}

/// GET /sequence-node/:key - Read a cached sequence node
pub async fn get_sequence_node_by_key(
    State(state): State<SequenceNodeState>,
    Path(key): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let node = state.provider.get_sequence_node_by_key(&key).await?;
    Ok(Json(node))
}

/// PUT /sequence-node/:key - Merge update data into a cached sequence node
pub async fn update_sequence_node(
    State(state): State<SequenceNodeState>,
    Path(key): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let data = json_body(payload)?;
    let node = state.provider.update_sequence_node_in_cache(&key, data).await?;
    Ok(Json(node))
}

/// DELETE /sequence-node/:key - Evict a cached sequence node
pub async fn evict_sequence_node(
    State(state): State<SequenceNodeState>,
    Path(key): Path<String>,
) -> ApiResult<StatusCode> {
    state.provider.evict_sequence_node(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router(provider: Arc<SequenceNodeProvider>) -> Router {
    let state = SequenceNodeState { provider };

    Router::new()
        .route("/", post(get_sequence_node))
        .route("/key", post(obtain_sequence_node_key))
        .route(
            "/:key",
            get(get_sequence_node_by_key)
                .put(update_sequence_node)
                .delete(evict_sequence_node),
        )
        .with_state(state)
}
