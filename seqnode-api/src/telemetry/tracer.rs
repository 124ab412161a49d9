//! Tracing Subscriber Initialization
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either
//! JSON (default, for log shippers) or human-readable output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

const DEFAULT_FILTER: &str = "seqnode_api=debug,seqnode_storage=debug,tower_http=debug,info";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Service version
    pub service_version: String,
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: std::env::var("SEQN_SERVICE_NAME")
                .unwrap_or_else(|_| "seqnode-api".to_string()),
            service_version: std::env::var("SEQN_SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_format: std::env::var("SEQN_LOG_FORMAT")
                .map(|s| match s.to_lowercase().as_str() {
                    "pretty" | "text" => LogFormat::Pretty,
                    _ => LogFormat::Json,
                })
                .unwrap_or(LogFormat::Json),
        }
    }
}

/// Initialize the tracing subscriber.
///
/// Call once at startup before anything logs. `RUST_LOG` overrides the
/// default filter.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    installed.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        service_version = %config.service_version,
        log_format = ?config.log_format,
        "Telemetry initialized"
    );

    Ok(())
}
