//! Service Configuration Module
//!
//! Provider, cache store and listener settings. Configuration is loaded from
//! environment variables with sensible defaults for development.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use seqnode_storage::DEFAULT_KEY_PREFIX;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// POLICY ENUMS
// ============================================================================

/// How the upstream client treats non-2xx responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// Non-2xx becomes an `UpstreamError` carrying the upstream status.
    #[default]
    Strict,
    /// Any response body is returned as content, whatever its status.
    PassThrough,
}

impl FromStr for StatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(StatusPolicy::Strict),
            "pass-through" | "passthrough" => Ok(StatusPolicy::PassThrough),
            other => Err(format!("unknown upstream status policy '{}'", other)),
        }
    }
}

/// Merge strategy for `update_sequence_node_in_cache`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicyKind {
    #[default]
    KeepExisting,
    ReplaceContent,
    MergePatch,
}

impl FromStr for MergePolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep-existing" => Ok(MergePolicyKind::KeepExisting),
            "replace-content" => Ok(MergePolicyKind::ReplaceContent),
            "merge-patch" => Ok(MergePolicyKind::MergePatch),
            other => Err(format!("unknown merge policy '{}'", other)),
        }
    }
}

/// Which key-value store backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Lmdb,
}

impl FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(CacheBackendKind::Memory),
            "lmdb" => Ok(CacheBackendKind::Lmdb),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

impl fmt::Display for CacheBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheBackendKind::Memory => f.write_str("memory"),
            CacheBackendKind::Lmdb => f.write_str("lmdb"),
        }
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

// ============================================================================
// PROVIDER CONFIGURATION
// ============================================================================

/// Settings for the sequence node provider and its upstream client.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Namespace prepended to every cache key.
    pub key_prefix: String,

    /// Upstream URL used when an identifier carries none.
    /// When unset, identifiers must supply `url`.
    pub default_upstream_url: Option<String>,

    /// Upstream HTTP timeout. Expiry surfaces as an upstream error.
    pub upstream_timeout: Duration,

    pub status_policy: StatusPolicy,

    /// Serialize concurrent misses on the same key.
    pub coalesce_misses: bool,

    pub merge_policy: MergePolicyKind,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            default_upstream_url: None,
            upstream_timeout: Duration::from_millis(30_000),
            status_policy: StatusPolicy::Strict,
            coalesce_misses: false,
            merge_policy: MergePolicyKind::KeepExisting,
        }
    }
}

impl ProviderConfig {
    /// Create ProviderConfig from environment variables.
    ///
    /// Environment variables:
    /// - `SEQN_KEY_PREFIX`: Cache namespace (default: "SEQN:")
    /// - `SEQN_UPSTREAM_URL`: Default upstream URL (default: unset)
    /// - `SEQN_UPSTREAM_TIMEOUT_MS`: Upstream timeout (default: 30000)
    /// - `SEQN_UPSTREAM_STATUS_POLICY`: "strict" or "pass-through" (default: strict)
    /// - `SEQN_COALESCE_MISSES`: "true" or "false" (default: false)
    /// - `SEQN_MERGE_POLICY`: "keep-existing", "replace-content" or "merge-patch"
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Unparseable values fall back
    /// to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let key_prefix = lookup("SEQN_KEY_PREFIX")
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.key_prefix);

        let default_upstream_url = lookup("SEQN_UPSTREAM_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let upstream_timeout = lookup("SEQN_UPSTREAM_TIMEOUT_MS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.upstream_timeout);

        let status_policy = lookup("SEQN_UPSTREAM_STATUS_POLICY")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.status_policy);

        let coalesce_misses = lookup("SEQN_COALESCE_MISSES")
            .map(|s| parse_flag(&s))
            .unwrap_or(defaults.coalesce_misses);

        let merge_policy = lookup("SEQN_MERGE_POLICY")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.merge_policy);

        Self {
            key_prefix,
            default_upstream_url,
            upstream_timeout,
            status_policy,
            coalesce_misses,
            merge_policy,
        }
    }

    pub fn with_default_upstream_url(mut self, url: impl Into<String>) -> Self {
        self.default_upstream_url = Some(url.into());
        self
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    pub fn with_coalesce_misses(mut self, enabled: bool) -> Self {
        self.coalesce_misses = enabled;
        self
    }

    pub fn with_merge_policy(mut self, policy: MergePolicyKind) -> Self {
        self.merge_policy = policy;
        self
    }
}

// ============================================================================
// STORE CONFIGURATION
// ============================================================================

/// Settings for the cache store backend.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: CacheBackendKind,
    /// LMDB directory.
    pub path: PathBuf,
    /// LMDB map size in megabytes.
    pub max_size_mb: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            path: PathBuf::from("./data/seqn-cache"),
            max_size_mb: 256,
        }
    }
}

impl StoreConfig {
    /// Create StoreConfig from environment variables.
    ///
    /// Environment variables:
    /// - `SEQN_CACHE_BACKEND`: "memory" or "lmdb" (default: memory)
    /// - `SEQN_CACHE_PATH`: LMDB directory (default: ./data/seqn-cache)
    /// - `SEQN_CACHE_MAX_SIZE_MB`: LMDB map size (default: 256)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            backend: lookup("SEQN_CACHE_BACKEND")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.backend),
            path: lookup("SEQN_CACHE_PATH")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.path),
            max_size_mb: lookup("SEQN_CACHE_MAX_SIZE_MB")
                .and_then(|s| s.parse().ok())
                .filter(|mb: &usize| *mb > 0)
                .unwrap_or(defaults.max_size_mb),
        }
    }
}

// ============================================================================
// SERVER CONFIGURATION
// ============================================================================

/// Listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: "3000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Environment variables: `SEQN_API_BIND` (default 0.0.0.0) and `PORT`
    /// or `SEQN_API_PORT` (default 3000).
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host: lookup("SEQN_API_BIND").unwrap_or(defaults.host),
            port: lookup("PORT")
                .or_else(|| lookup("SEQN_API_PORT"))
                .unwrap_or(defaults.port),
        }
    }

    /// Resolve the socket address to bind.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let port = self.port.parse::<u16>().map_err(|_| {
            ApiError::invalid_input(format!("Invalid port value: {}", self.port))
        })?;

        let addr = format!("{}:{}", self.host, port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
        })
    }
}
