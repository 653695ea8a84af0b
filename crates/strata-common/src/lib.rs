//! Shared utilities for strata crates
//!
//! Small building blocks used by more than one crate in the workspace:
//!
//! - [`validation`]: the safe-filename grammar used for cache keys and namespaces
//! - [`atomic_file`]: temp-file-then-rename writes with a single retry
//! - [`logging`]: log level parsing and `tracing` subscriber setup

pub mod atomic_file;
pub mod logging;
pub mod validation;

pub use atomic_file::{
    is_temp_artifact, save_json_atomic, write_atomic, AtomicWriteError, AtomicWriteResult,
};
pub use logging::{init_logging, LogLevel};
pub use validation::{is_valid_filename, FilenameValidator, ValidationError, Validator};
