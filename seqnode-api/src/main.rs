//! Seqnode API Server Entry Point
//!
//! Bootstraps configuration, opens the cache store, and starts the Axum
//! HTTP server. The store is closed after the server stops.

use std::sync::Arc;

use axum::Router;
use seqnode_api::telemetry::{init_tracing, TelemetryConfig};
use seqnode_api::{
    create_api_router, open_store, ApiError, ApiResult, HttpUpstreamClient, ProviderConfig,
    SequenceNodeProvider, ServerConfig, StoreConfig,
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let provider_config = ProviderConfig::from_env();
    let store_config = StoreConfig::from_env();
    let server_config = ServerConfig::from_env();

    let store = open_store(&store_config)?;
    let upstream = Arc::new(HttpUpstreamClient::new(
        provider_config.upstream_timeout,
        provider_config.status_policy,
    )?);
    let provider = Arc::new(SequenceNodeProvider::new(&provider_config, store, upstream)?);
    tracing::info!(provider = ?provider, "Sequence node provider ready");

    let app: Router = create_api_router(provider.clone());

    let addr = server_config.bind_addr()?;
    tracing::info!(%addr, "Starting seqnode API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    if let Err(e) = provider.close().await {
        tracing::warn!(error = %e, "Cache store did not close cleanly");
    }
    Ok(())
}
