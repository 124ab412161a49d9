//! Error Types for the Sequence Node API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON `{statusCode, error, code, details?}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use seqnode_core::{CacheError, SeqnError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Client Errors (400, 404)
    // ========================================================================
    /// Identifier envelope failed structural validation
    ValidationFailed,

    /// Request body could not be understood
    InvalidInput,

    /// Sequence node key is malformed
    InvalidKey,

    /// No cached sequence node under the key
    SequenceNodeNotFound,

    // ========================================================================
    // Upstream Errors (status carried from upstream, default 500)
    // ========================================================================
    /// The authoritative source failed or rejected the request
    UpstreamFailed,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Cache store failed on a path where failure is surfaced
    CacheError,

    /// Internal server error
    InternalError,

    /// Service is temporarily unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Default HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed | ErrorCode::InvalidInput | ErrorCode::InvalidKey => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::SequenceNodeNotFound => StatusCode::NOT_FOUND,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::UpstreamFailed | ErrorCode::CacheError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Identifier validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::InvalidKey => "Invalid sequence node key",
            ErrorCode::SequenceNodeNotFound => "Sequence node not found",
            ErrorCode::UpstreamFailed => "Upstream request failed",
            ErrorCode::CacheError => "Cache operation failed",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// HTTP status of the response
    #[serde(rename = "statusCode")]
    pub status_code: u16,

    /// Human-readable error message
    pub error: String,

    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Optional additional details (violated fields, upstream cause)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the code's default status.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.status_code().as_u16(),
            error: message.into(),
            code,
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Override the HTTP status, e.g. with one relayed from upstream.
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    /// HTTP status of the response. Out-of-range values fall back to 500.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SequenceNodeNotFound, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.error)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Implement IntoResponse for ApiError to enable automatic error handling in Axum.
///
/// ```ignore
/// async fn handler() -> Result<Json<RetrievalResult>, ApiError> {
///     Err(ApiError::not_found("no such key"))
/// }
/// ```
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self)).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<SeqnError> for ApiError {
    fn from(err: SeqnError) -> Self {
        let status = err.status_code();
        match err {
            SeqnError::Validation(e) => {
                let details = serde_json::to_value(&e.violations).unwrap_or_default();
                ApiError::validation_failed(e.to_string()).with_details(details)
            }
            SeqnError::NotFound { key } => {
                ApiError::not_found(format!("Sequence node not found for key {}", key))
            }
            SeqnError::InvalidKey { value, reason } => ApiError::new(
                ErrorCode::InvalidKey,
                format!("Invalid sequence node key '{}': {}", value, reason),
            ),
            SeqnError::Upstream(e) => {
                ApiError::new(ErrorCode::UpstreamFailed, e.to_string()).with_status(status)
            }
            SeqnError::Cache(e) => {
                // Full cause goes to the log; the body only names the class
                tracing::error!(error = %e, "Cache error surfaced to caller");
                let message = match e {
                    CacheError::MissingContent => "Upstream returned no sequence node content",
                    CacheError::Transport { .. } | CacheError::Corrupt { .. } => {
                        ErrorCode::CacheError.default_message()
                    }
                };
                ApiError::new(ErrorCode::CacheError, message)
            }
            SeqnError::Serialization { reason } => {
                tracing::error!(reason = %reason, "Serialization error");
                ApiError::internal_error(format!("Serialization error: {}", reason))
            }
        }
    }
}

/// Convert from serde_json::Error to ApiError.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
