//! Cache-related error types
//!
//! Storage failures are not errors: backends report them as `false` or a
//! miss. What remains here are programmer and configuration mistakes.

use strata_common::ValidationError;
use strata_hooks::HooksError;
use thiserror::Error;

/// Cache operation errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid cache key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Invalid cache namespace '{namespace}': {reason}")]
    InvalidNamespace { namespace: String, reason: String },

    #[error("Invalid cache version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("Unknown cache backend type: {backend_type}")]
    UnknownBackend { backend_type: String },

    #[error("Invalid configuration for backend '{backend_type}': {message}")]
    Configuration {
        backend_type: String,
        message: String,
    },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Hook registration failed: {0}")]
    Hooks(#[from] HooksError),
}

impl CacheError {
    pub(crate) fn invalid_key(key: &str, err: ValidationError) -> Self {
        CacheError::InvalidKey {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn configuration(backend_type: &str, message: impl Into<String>) -> Self {
        CacheError::Configuration {
            backend_type: backend_type.to_string(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for CacheError {
    fn from(err: config::ConfigError) -> Self {
        CacheError::Settings(err.to_string())
    }
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
