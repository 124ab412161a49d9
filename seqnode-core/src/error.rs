//! Error types for sequence node retrieval

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single violated field in an identifier envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// JSON pointer of the offending field, e.g. `/content/@type`.
    pub field: String,
    pub reason: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Identifier failed structural validation.
///
/// Carries every violated field, not just the first one found.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Identifier validation failed: {}", join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    /// Field pointers in the order they were reported.
    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Cache store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// The underlying store could not be reached or the operation failed.
    #[error("Cache transport error: {reason}")]
    Transport { reason: String },

    /// A stored value could not be decoded as a cache entry.
    #[error("Corrupt cache entry under {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// Attempted to build or store an entry without content.
    #[error("Cache entry has no sequence node content")]
    MissingContent,
}

impl CacheError {
    pub fn transport(reason: impl fmt::Display) -> Self {
        Self::Transport {
            reason: reason.to_string(),
        }
    }
}

/// Failure talking to the authoritative upstream service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Upstream request failed with status {status_code}: {cause}")]
pub struct UpstreamError {
    pub status_code: u16,
    pub cause: String,
}

impl UpstreamError {
    /// Transport-level failure (connect, timeout, unreadable body).
    pub fn transport(cause: impl fmt::Display) -> Self {
        Self {
            status_code: 500,
            cause: cause.to_string(),
        }
    }

    /// The upstream answered with a non-success status.
    pub fn status(status_code: u16, cause: impl Into<String>) -> Self {
        Self {
            status_code,
            cause: cause.into(),
        }
    }
}

/// Master error type for sequence node operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SeqnError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Sequence node not found for key {key}")]
    NotFound { key: String },

    #[error("Invalid sequence node key '{value}': {reason}")]
    InvalidKey { value: String, reason: String },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl SeqnError {
    /// HTTP status this error should surface as.
    pub fn status_code(&self) -> u16 {
        match self {
            SeqnError::Validation(_) | SeqnError::InvalidKey { .. } => 400,
            SeqnError::NotFound { .. } => 404,
            SeqnError::Upstream(e) => e.status_code,
            SeqnError::Cache(_) | SeqnError::Serialization { .. } => 500,
        }
    }
}

impl From<serde_json::Error> for SeqnError {
    fn from(e: serde_json::Error) -> Self {
        SeqnError::Serialization {
            reason: e.to_string(),
        }
    }
}

/// Result type alias for sequence node operations.
pub type SeqnResult<T> = Result<T, SeqnError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_field() {
        let err = ValidationError::new(vec![
            FieldViolation::new("/content/@type", "must equal \"SequenceNode\""),
            FieldViolation::new("/content/targetBinding", "is required"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("/content/@type"));
        assert!(msg.contains("/content/targetBinding"));
        assert_eq!(err.fields(), vec!["/content/@type", "/content/targetBinding"]);
    }

    #[test]
    fn test_upstream_transport_is_500() {
        let err = UpstreamError::transport("connection refused");
        assert_eq!(err.status_code, 500);
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_status_code_mapping() {
        let validation: SeqnError = ValidationError::new(vec![]).into();
        assert_eq!(validation.status_code(), 400);

        let not_found = SeqnError::NotFound {
            key: "abc".to_string(),
        };
        assert_eq!(not_found.status_code(), 404);

        let upstream: SeqnError = UpstreamError::status(503, "unavailable").into();
        assert_eq!(upstream.status_code(), 503);

        let cache: SeqnError = CacheError::MissingContent.into();
        assert_eq!(cache.status_code(), 500);
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json")
            .expect_err("input is malformed");
        let err: SeqnError = parse_err.into();
        assert!(matches!(err, SeqnError::Serialization { .. }));
    }
}
