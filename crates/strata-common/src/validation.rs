//! Validation traits and the safe-filename validator
//!
//! Every identifier that may end up as a file name on disk (cache keys,
//! namespaces, version strings) goes through the same grammar so that no
//! backend ever has to second-guess its input.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Alphanumeric first character, then alphanumerics, `_`, `.` or `-`.
static SAFE_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").expect("safe filename pattern is valid")
});

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Format error for {field}: {message}")]
    Format { field: String, message: String },
}

/// Trait for validators that can check values
pub trait Validator<T: ?Sized> {
    /// Validate a value
    fn validate(&self, value: &T) -> Result<(), ValidationError>;
}

/// Returns true if `name` can be used verbatim as a file name.
pub fn is_valid_filename(name: &str) -> bool {
    SAFE_FILENAME.is_match(name)
}

/// Validator for identifiers that become part of a file name
#[derive(Debug, Clone)]
pub struct FilenameValidator {
    field: &'static str,
}

impl FilenameValidator {
    pub fn new(field: &'static str) -> Self {
        Self { field }
    }
}

impl Validator<str> for FilenameValidator {
    fn validate(&self, value: &str) -> Result<(), ValidationError> {
        if value.is_empty() {
            return Err(ValidationError::Required {
                field: self.field.to_string(),
            });
        }

        if !is_valid_filename(value) {
            return Err(ValidationError::Format {
                field: self.field.to_string(),
                message: format!(
                    "'{}' must start with a letter or digit and contain only letters, digits, '_', '.' or '-'",
                    value.escape_debug()
                ),
            });
        }

        Ok(())
    }
}
