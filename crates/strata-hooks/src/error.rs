//! Error types for the hooks system

use thiserror::Error;

/// Errors that can occur in the hooks system
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HooksError {
    /// Hook not found in the registry
    ///
    /// The string contains the hook ID that was not found.
    #[error("Hook not found: {0}")]
    HookNotFound(String),

    /// Event name rejected at registration
    #[error("Invalid event name: {0:?}")]
    InvalidEvent(String),
}

/// Result type for hooks operations
pub type Result<T> = std::result::Result<T, HooksError>;
