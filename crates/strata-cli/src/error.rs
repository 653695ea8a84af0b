// CLI error types

use strata_cache::CacheError;
use thiserror::Error;

/// Errors surfaced by `strata` commands
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Key not found: {key}")]
    NotFound { key: String },

    #[error("Operation failed: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Message shown to the user, with a hint where one helps
    pub fn user_message(&self) -> String {
        match self {
            CliError::Cache(CacheError::InvalidKey { key, reason }) => {
                format!(
                    "Invalid key '{key}': {reason}\n\nKeys start with a letter or digit and may contain letters, digits, '_', '.' and '-'."
                )
            }
            CliError::Cache(CacheError::UnknownBackend { backend_type }) => {
                format!(
                    "Unknown backend type '{backend_type}'.\n\nBuilt-in types: array, file, chained, null."
                )
            }
            CliError::Cache(e) => format!("{e}\n\nRun 'strata info' to check the active settings."),
            CliError::NotFound { key } => format!("Key '{key}' is not cached"),
            other => other.to_string(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound { .. } => 2,
            _ => 1,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
