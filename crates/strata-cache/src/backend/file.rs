//! On-disk backend ("file")
//!
//! One file per entry, `<id>.cache`, holding a JSON envelope with the payload,
//! its expiry instant and a completion marker. Writes go through
//! [`strata_common::write_atomic`], so a reader observes either the previous
//! complete entry or the new one.
//!
//! Decoded files are memoized in-process. A memo entry is reused only while
//! the file's modification time and length are unchanged, and it is dropped
//! explicitly on every save, delete and flush through this instance.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_common::{is_temp_artifact, save_json_atomic};
use tracing::{debug, warn};

use super::{expiry_after, is_expired, Backend};

/// Extension of entry files
pub const CACHE_FILE_EXTENSION: &str = "cache";

/// Callback run after each flush with the backend's directory
pub type FlushObserver = Arc<dyn Fn(&Path) + Send + Sync>;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    data: &'a Value,
    expires_at: Option<DateTime<Utc>>,
    complete: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct Envelope {
    data: Value,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl FileStamp {
    fn of(metadata: &fs::Metadata) -> Self {
        Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        }
    }
}

struct Loaded {
    stamp: FileStamp,
    envelope: Envelope,
}

/// Directory-backed cache storage
pub struct FileBackend {
    directory: PathBuf,
    invalidate_before_read: bool,
    loaded: Mutex<HashMap<PathBuf, Loaded>>,
    observers: RwLock<Vec<FlushObserver>>,
}

impl FileBackend {
    /// Backend storing entries in `directory`, created on first write
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            invalidate_before_read: false,
            loaded: Mutex::new(HashMap::new()),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Always re-read files instead of trusting the in-process memo
    pub fn with_invalidate_before_read(mut self, enabled: bool) -> Self {
        self.invalidate_before_read = enabled;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn invalidates_before_read(&self) -> bool {
        self.invalidate_before_read
    }

    /// Register a callback run once per [`flush`](Backend::flush)
    pub fn add_flush_observer(&self, observer: FlushObserver) {
        self.observers.write().push(observer);
    }

    /// Path of the entry file for `id`, or `None` if `id` is not a plain file name
    pub fn path_for(&self, id: &str) -> Option<PathBuf> {
        let unsafe_id = id.is_empty()
            || id == "."
            || id == ".."
            || id.chars().any(|c| c == '/' || c == '\\' || c.is_control());
        if unsafe_id {
            debug!(id = %id.escape_debug(), "Rejected unsafe cache file id");
            return None;
        }
        Some(self.directory.join(format!("{id}.{CACHE_FILE_EXTENSION}")))
    }

    fn forget(&self, path: &Path) {
        self.loaded.lock().remove(path);
    }

    fn load(&self, path: &Path) -> Option<Envelope> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return None,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    debug!(path = %path.display(), error = %e, "Cache file unreadable");
                }
                self.forget(path);
                return None;
            }
        };
        let stamp = FileStamp::of(&metadata);

        if let Some(loaded) = self.loaded.lock().get(path) {
            if loaded.stamp == stamp {
                return Some(loaded.envelope.clone());
            }
        }

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Cache file unreadable");
                self.forget(path);
                return None;
            }
        };

        let envelope: Envelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Cache file is not a valid entry");
                self.forget(path);
                return None;
            }
        };

        self.loaded.lock().insert(
            path.to_path_buf(),
            Loaded {
                stamp,
                envelope: envelope.clone(),
            },
        );
        Some(envelope)
    }

    fn clear_directory(&self) -> bool {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return true,
            Err(e) => {
                warn!(directory = %self.directory.display(), error = %e, "Cannot list cache directory");
                return false;
            }
        };

        let mut ok = true;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(directory = %self.directory.display(), error = %e, "Cannot read cache directory entry");
                    ok = false;
                    continue;
                }
            };

            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let removed = if is_dir {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };

            match removed {
                Ok(()) => {
                    if is_temp_artifact(&entry.file_name()) {
                        debug!(path = %path.display(), "Removed orphaned temp file");
                    }
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove cache file");
                    ok = false;
                }
            }
        }
        ok
    }
}

impl std::fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackend")
            .field("directory", &self.directory)
            .field("invalidate_before_read", &self.invalidate_before_read)
            .field("observers", &self.observers.read().len())
            .finish()
    }
}

impl Backend for FileBackend {
    fn fetch(&self, id: &str) -> Option<Value> {
        let path = self.path_for(id)?;
        if self.invalidate_before_read {
            self.forget(&path);
        }

        let envelope = self.load(&path)?;
        if !envelope.complete {
            debug!(path = %path.display(), "Cache file lacks completion marker");
            return None;
        }
        if is_expired(envelope.expires_at) {
            debug!(path = %path.display(), "Cache file expired");
            return None;
        }
        Some(envelope.data)
    }

    fn contains(&self, id: &str) -> bool {
        self.fetch(id).is_some()
    }

    fn save(&self, id: &str, payload: &Value, ttl: u64) -> bool {
        let Some(path) = self.path_for(id) else {
            return false;
        };

        if let Err(e) = fs::create_dir_all(&self.directory) {
            warn!(directory = %self.directory.display(), error = %e, "Cannot create cache directory");
            return false;
        }

        let envelope = EnvelopeRef {
            data: payload,
            expires_at: expiry_after(ttl),
            complete: true,
        };
        let written = save_json_atomic(&path, &envelope);
        self.forget(&path);

        match written {
            Ok(()) => {
                debug!(path = %path.display(), ttl, "Saved cache file");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to save cache file");
                false
            }
        }
    }

    fn delete(&self, id: &str) -> bool {
        let Some(path) = self.path_for(id) else {
            return false;
        };

        let removed = fs::remove_file(&path);
        self.forget(&path);

        match removed {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to delete cache file");
                false
            }
        }
    }

    fn flush(&self) -> bool {
        let ok = self.clear_directory();
        self.loaded.lock().clear();

        let observers: Vec<FlushObserver> = self.observers.read().iter().cloned().collect();
        for observer in &observers {
            observer(&self.directory);
        }

        debug!(directory = %self.directory.display(), ok, "Flushed cache directory");
        ok
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn backend() -> (TempDir, FileBackend) {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path().join("cache"));
        (dir, backend)
    }

    #[test]
    fn test_round_trip_and_lazy_directory() {
        let (_dir, backend) = backend();
        assert!(!backend.directory().exists());
        assert_eq!(backend.fetch("a"), None);

        assert!(backend.save("a", &json!({"v": [1, 2]}), 0));
        assert!(backend.directory().join("a.cache").is_file());
        assert_eq!(backend.fetch("a"), Some(json!({"v": [1, 2]})));
        assert!(backend.contains("a"));
    }

    #[test]
    fn test_saved_file_is_a_complete_json_envelope() {
        let (_dir, backend) = backend();
        assert!(backend.save("env", &json!("payload"), 0));

        let raw = fs::read(backend.path_for("env").unwrap()).unwrap();
        let envelope: Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(envelope["data"], json!("payload"));
        assert_eq!(envelope["expires_at"], Value::Null);
        assert_eq!(envelope["complete"], json!(true));
    }

    #[test]
    fn test_entries_survive_new_instance() {
        let (dir, backend) = backend();
        backend.save("a", &json!("persisted"), 0);

        let reopened = FileBackend::new(dir.path().join("cache"));
        assert_eq!(reopened.fetch("a"), Some(json!("persisted")));
    }

    #[test]
    fn test_overwrite_is_seen_by_other_instance() {
        let (dir, backend) = backend();
        let other = FileBackend::new(dir.path().join("cache"));

        backend.save("a", &json!("one"), 0);
        assert_eq!(other.fetch("a"), Some(json!("one")));

        backend.save("a", &json!("a longer second value"), 0);
        assert_eq!(other.fetch("a"), Some(json!("a longer second value")));
    }

    #[test]
    fn test_corrupt_and_unmarked_files_are_misses() {
        let (_dir, backend) = backend();
        fs::create_dir_all(backend.directory()).unwrap();

        fs::write(backend.directory().join("trunc.cache"), br#"{"data": {"a": 1"#).unwrap();
        fs::write(
            backend.directory().join("nomark.cache"),
            br#"{"data": 1, "expires_at": null}"#,
        )
        .unwrap();
        fs::write(
            backend.directory().join("unfinished.cache"),
            br#"{"data": 1, "expires_at": null, "complete": false}"#,
        )
        .unwrap();

        assert_eq!(backend.fetch("trunc"), None);
        assert_eq!(backend.fetch("nomark"), None);
        assert!(!backend.contains("unfinished"));
    }

    #[test]
    fn test_expired_file_is_miss_but_not_deleted() {
        let (_dir, backend) = backend();
        fs::create_dir_all(backend.directory()).unwrap();
        let path = backend.directory().join("old.cache");
        fs::write(
            &path,
            br#"{"data": 1, "expires_at": "2001-01-01T00:00:00Z", "complete": true}"#,
        )
        .unwrap();

        assert_eq!(backend.fetch("old"), None);
        assert!(!backend.contains("old"));
        assert!(path.exists());
    }

    #[test]
    fn test_stray_temp_file_is_not_served_and_is_flushed() {
        let (_dir, backend) = backend();
        backend.save("a", &json!(1), 0);
        let stray = backend.directory().join(".strata-crashed.tmp");
        fs::write(&stray, b"{\"data\": 2").unwrap();

        assert_eq!(backend.fetch("a"), Some(json!(1)));
        assert!(backend.flush());
        assert!(!stray.exists());
        assert!(backend.directory().exists());
        assert_eq!(fs::read_dir(backend.directory()).unwrap().count(), 0);
    }

    #[test]
    fn test_flush_removes_subdirectories() {
        let (_dir, backend) = backend();
        let nested = backend.directory().join("nested").join("deeper");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("x.cache"), b"{}").unwrap();

        assert!(backend.flush());
        assert!(!backend.directory().join("nested").exists());
    }

    #[test]
    fn test_flush_on_missing_directory() {
        let (_dir, backend) = backend();
        assert!(backend.flush());
    }

    #[test]
    fn test_delete() {
        let (_dir, backend) = backend();
        backend.save("a", &json!(1), 0);
        assert!(backend.delete("a"));
        assert!(!backend.delete("a"));
        assert_eq!(backend.fetch("a"), None);
    }

    #[test]
    fn test_unsafe_ids_touch_nothing() {
        let (dir, backend) = backend();
        for id in ["", ".", "..", "../escape", "a/b", "a\\b", "nul\0"] {
            assert!(!backend.save(id, &json!(1), 0), "{id:?}");
            assert_eq!(backend.fetch(id), None);
            assert!(!backend.delete(id));
        }
        assert!(!backend.directory().exists());
        assert!(!dir.path().join("escape.cache").exists());
    }

    #[test]
    fn test_unwritable_directory_fails_save() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();

        let backend = FileBackend::new(&blocker);
        assert!(!backend.save("a", &json!(1), 0));
        assert_eq!(backend.fetch("a"), None);
    }

    #[test]
    fn test_flush_observers_run_once_per_flush() {
        let (_dir, backend) = backend();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        backend.add_flush_observer(Arc::new(move |_: &Path| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        backend.save("a", &json!(1), 0);
        backend.save("b", &json!(2), 0);
        backend.flush();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        backend.flush();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalidate_before_read() {
        let (_dir, backend) = backend();
        let backend = backend.with_invalidate_before_read(true);
        assert!(backend.invalidates_before_read());

        backend.save("a", &json!(1), 0);
        assert_eq!(backend.fetch("a"), Some(json!(1)));

        let path = backend.path_for("a").unwrap();
        fs::write(&path, br#"{"data": 2, "expires_at": null, "complete": true}"#).unwrap();
        assert_eq!(backend.fetch("a"), Some(json!(2)));
    }
}
