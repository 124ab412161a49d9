//! Health Check Endpoints
//!
//! - /health/ping - Simple liveness check
//! - /health/ready - Cache store check with usage statistics

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::provider::SequenceNodeProvider;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDetails {
    pub cache: CacheHealth,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHealth {
    pub status: HealthStatus,
    pub backend: String,
    pub merge_policy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub misses: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone)]
pub struct HealthState {
    pub provider: Arc<SequenceNodeProvider>,
    pub start_time: std::time::Instant,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping - Simple pong response
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/ready - Readiness check (cache store reachable)
pub async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let cache = state.provider.cache();
    let base = CacheHealth {
        status: HealthStatus::Healthy,
        backend: cache.backend_name().to_string(),
        merge_policy: state.provider.merge_policy_name().to_string(),
        hits: None,
        misses: None,
        entry_count: None,
        hit_rate: None,
        error: None,
    };

    let cache_health = match state.provider.cache_stats().await {
        Ok(stats) => CacheHealth {
            hits: Some(stats.hits),
            misses: Some(stats.misses),
            entry_count: Some(stats.entry_count),
            hit_rate: Some(stats.hit_rate()),
            ..base
        },
        Err(e) => CacheHealth {
            status: HealthStatus::Unhealthy,
            error: Some(e.to_string()),
            ..base
        },
    };

    let overall_status = cache_health.status;
    let response = HealthResponse {
        status: overall_status,
        details: Some(HealthDetails {
            cache: cache_health,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.start_time.elapsed().as_secs(),
        }),
    };

    let status_code = if overall_status == HealthStatus::Healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router
pub fn create_router(provider: Arc<SequenceNodeProvider>) -> Router {
    let state = Arc::new(HealthState {
        provider,
        start_time: std::time::Instant::now(),
    });

    Router::new()
        .route("/ping", get(ping))
        .route("/ready", get(readiness))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            details: None,
        };

        let json = serde_json::to_string(&response).expect("serializes");
        assert!(json.contains("\"status\":\"healthy\""));
    }

    #[test]
    fn test_cache_health_with_error() {
        let component = CacheHealth {
            status: HealthStatus::Unhealthy,
            backend: "lmdb".to_string(),
            merge_policy: "keep-existing".to_string(),
            hits: None,
            misses: None,
            entry_count: None,
            hit_rate: None,
            error: Some("LMDB store is closed".to_string()),
        };

        let json = serde_json::to_string(&component).expect("serializes");
        assert!(json.contains("\"status\":\"unhealthy\""));
        assert!(json.contains("LMDB store is closed"));
        assert!(!json.contains("entry_count"));
    }
}
