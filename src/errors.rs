//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the mod catalog cache engine. Every failure
//! mode of the subsystem is represented here as a value; the orchestrator
//! turns them into "try the next strategy" decisions rather than letting any
//! of them propagate past its public entry points.
//!
//! ## Error Categories
//! - **Upstream**: transient network/5xx failures, rate limiting, not-found
//! - **Persistence**: durable mirror unavailable or corrupted
//! - **Configuration**: invalid or unreadable configuration
//! - **Serialization**: bincode/JSON/TOML conversion failures

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, CacheError>;

/// Error types for the catalog cache engine
#[derive(Debug, Error)]
pub enum CacheError {
    /// Transient upstream failure (timeout, 5xx, connection reset).
    /// Retried only via the next strategy in the chain, never in a loop.
    #[error("transient upstream error from {source_name}: {details}")]
    TransientUpstream {
        source_name: String,
        details: String,
    },

    /// The shared token bucket had no token for this call. The chain logs
    /// it as a skip and moves to the next strategy; callers never see it.
    #[error("rate limit exceeded for {source_name}")]
    RateLimitExceeded { source_name: String },

    /// Upstream answered authoritatively that the key does not exist.
    /// Treated as empty and triggers fallthrough.
    #[error("upstream has no data for {key}")]
    NotFoundUpstream { key: String },

    /// A live fetch exceeded its per-call time budget
    #[error("upstream call timed out after {timeout_ms}ms")]
    UpstreamTimeout { timeout_ms: u64 },

    /// The durable mirror cannot be used for the rest of this process
    #[error("persistence unavailable: {details}")]
    PersistenceUnavailable { details: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Validation errors on upstream payloads or requests
    #[error("validation failed for field '{field}': {reason}")]
    ValidationFailed { field: String, reason: String },

    /// Database errors from the mirror backend
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    /// Binary serialization errors for mirrored records
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON parsing errors at the catalog boundary
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal system errors
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl CacheError {
    /// Whether the next strategy in the chain may plausibly succeed where
    /// this one failed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CacheError::TransientUpstream { .. }
                | CacheError::RateLimitExceeded { .. }
                | CacheError::NotFoundUpstream { .. }
                | CacheError::UpstreamTimeout { .. }
                | CacheError::PersistenceUnavailable { .. }
        )
    }

    /// Error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            CacheError::TransientUpstream { .. }
            | CacheError::RateLimitExceeded { .. }
            | CacheError::NotFoundUpstream { .. }
            | CacheError::UpstreamTimeout { .. } => "upstream",
            CacheError::PersistenceUnavailable { .. }
            | CacheError::Database(_)
            | CacheError::Serialization(_) => "persistence",
            CacheError::Config { .. } | CacheError::ValidationFailed { .. } => "configuration",
            CacheError::Json(_) | CacheError::Toml(_) => "parsing",
            CacheError::Io(_) | CacheError::Internal { .. } => "system",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_are_recoverable() {
        let err = CacheError::TransientUpstream {
            source_name: "catalog".to_string(),
            details: "503".to_string(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.category(), "upstream");
    }

    #[test]
    fn rate_limit_skips_are_recoverable() {
        let err = CacheError::RateLimitExceeded {
            source_name: "catalog".to_string(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.category(), "upstream");
    }

    #[test]
    fn config_failures_are_not_recoverable() {
        let err = CacheError::Config {
            message: "bad port".to_string(),
        };
        assert!(!err.is_recoverable());
        assert_eq!(err.category(), "configuration");
    }
}
