//! Atomic file replacement
//!
//! Content is written to a uniquely named temp file in the destination's
//! directory, flushed, and renamed over the destination. Readers therefore see
//! either the previous file or the complete new one, never a partial write.
//!
//! Temp files are named `.strata-<random>.tmp` so that directory sweeps can
//! recognise and remove leftovers from crashed writers.

use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::{Builder, NamedTempFile};
use thiserror::Error;
use tracing::{debug, warn};

/// Prefix of every temp file created by [`write_atomic`]
pub const TEMP_PREFIX: &str = ".strata-";

/// Suffix of every temp file created by [`write_atomic`]
pub const TEMP_SUFFIX: &str = ".tmp";

/// Atomic write errors
#[derive(Debug, Error)]
pub enum AtomicWriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to move temp file into place at {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Destination has no parent directory: {path}")]
    NoParent { path: PathBuf },
}

/// Result type for atomic write operations
pub type AtomicWriteResult<T> = Result<T, AtomicWriteError>;

/// Returns true if `file_name` looks like a temp file left by [`write_atomic`].
pub fn is_temp_artifact(file_name: &OsStr) -> bool {
    file_name
        .to_str()
        .map(|name| name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX))
        .unwrap_or(false)
}

/// Atomically replace `path` with `bytes`.
///
/// The parent directory must already exist. If the rename fails, the
/// destination is removed and the rename is attempted once more. When the
/// second attempt fails too, the temp file is deleted and the error returned.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> AtomicWriteResult<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        Some(_) => Path::new("."),
        None => {
            return Err(AtomicWriteError::NoParent {
                path: path.to_path_buf(),
            })
        }
    };

    let mut temp = Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)?;
    temp.as_file_mut().write_all(bytes)?;
    temp.as_file().sync_all()?;

    persist_with_retry(temp, path)
}

fn persist_with_retry(temp: NamedTempFile, path: &Path) -> AtomicWriteResult<()> {
    let first = match temp.persist(path) {
        Ok(_) => return Ok(()),
        Err(err) => err,
    };

    debug!(
        path = %path.display(),
        error = %first.error,
        "Rename failed, removing destination and retrying"
    );

    if let Err(e) = fs::remove_file(path) {
        debug!(path = %path.display(), error = %e, "Could not remove destination");
    }

    match first.file.persist(path) {
        Ok(_) => Ok(()),
        Err(second) => {
            warn!(
                path = %path.display(),
                error = %second.error,
                "Atomic write failed after retry"
            );
            // dropping the handle deletes the temp file
            drop(second.file);
            Err(AtomicWriteError::Persist {
                path: path.to_path_buf(),
                source: second.error,
            })
        }
    }
}

/// Serialize `value` as JSON and write it atomically to `path`.
pub fn save_json_atomic<T, P>(path: P, value: &T) -> AtomicWriteResult<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let bytes = serde_json::to_vec(value)?;
    write_atomic(path.as_ref(), &bytes)
}
