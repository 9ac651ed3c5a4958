//! Engine Error Taxonomy
//!
//! Structured error types with HTTP-style status classes. Every failure path
//! in the engine maps to exactly one variant so callers (the routing layer is
//! an external collaborator) can translate errors without inspecting
//! messages.

use serde::{Deserialize, Serialize};

/// Root error type for all engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Bad input shape or range. Rejected before any state mutation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Session/user mismatch.
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Session id does not exist.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Action is illegal in the session's current status.
    #[error("Invalid state: {0}")]
    State(String),

    /// Balance below the requested bet amount.
    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: f64, required: f64 },

    /// Per-user action cap exceeded.
    #[error("Rate limit exceeded: {limit} actions per {window_secs}s")]
    RateLimited { limit: u32, window_secs: u64 },

    /// Transient persistence failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// HTTP-style status class for this error.
    pub fn status_class(&self) -> u16 {
        match self {
            EngineError::Validation(_) => 400,
            EngineError::Authorization(_) => 401,
            EngineError::NotFound(_) => 404,
            EngineError::State(_) => 400,
            EngineError::InsufficientFunds { .. } => 400,
            EngineError::RateLimited { .. } => 429,
            EngineError::Storage(_) => 500,
        }
    }

    /// Stable machine-readable code for the wire body.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::Authorization(_) => "AUTHORIZATION_ERROR",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::State(_) => "STATE_ERROR",
            EngineError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            EngineError::RateLimited { .. } => "RATE_LIMITED",
            EngineError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Wire-facing body. Storage errors are reported generically so internal
    /// detail never leaks to callers; the full message goes to the log.
    pub fn to_body(&self) -> ErrorBody {
        let message = match self {
            EngineError::Storage(detail) => {
                tracing::error!("storage failure surfaced to caller: {}", detail);
                "Internal error, please retry".to_string()
            }
            other => other.to_string(),
        };
        ErrorBody {
            code: self.code().to_string(),
            status: self.status_class(),
            message,
        }
    }
}

/// Structured error body returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub status: u16,
    pub message: String,
}

/// Configuration-specific errors, kept separate so config loading can fail
/// before an engine exists.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load config file {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert_eq!(EngineError::Validation("x".into()).status_class(), 400);
        assert_eq!(EngineError::Authorization("x".into()).status_class(), 401);
        assert_eq!(EngineError::NotFound("x".into()).status_class(), 404);
        assert_eq!(EngineError::State("x".into()).status_class(), 400);
        assert_eq!(
            EngineError::InsufficientFunds {
                balance: 1.0,
                required: 2.0
            }
            .status_class(),
            400
        );
        assert_eq!(
            EngineError::RateLimited {
                limit: 10,
                window_secs: 60
            }
            .status_class(),
            429
        );
        assert_eq!(EngineError::Storage("x".into()).status_class(), 500);
    }

    #[test]
    fn test_storage_error_body_is_generic() {
        let body = EngineError::Storage("rocksdb: file missing".into()).to_body();
        assert_eq!(body.status, 500);
        assert!(!body.message.contains("rocksdb"));
    }

    #[test]
    fn test_validation_error_body_is_verbatim() {
        let body = EngineError::Validation("target must be in [1,99]".into()).to_body();
        assert_eq!(body.code, "VALIDATION_ERROR");
        assert!(body.message.contains("[1,99]"));
    }
}
