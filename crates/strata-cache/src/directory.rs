//! Directory-scoped file cache
//!
//! Small settings caches each get their own subdirectory under a cache root
//! and a TTL that is never shorter than [`MINIMUM_TTL`].

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use strata_common::{FilenameValidator, Validator};
use tracing::debug;

use crate::backend::{Backend, FileBackend, FlushObserver};
use crate::error::{CacheError, Result};
use crate::key::CacheKey;

/// Shortest TTL in seconds a directory cache accepts
pub const MINIMUM_TTL: u64 = 60;

/// TTL in seconds when none is given
pub const DEFAULT_DIRECTORY_TTL: u64 = 300;

pub struct DirectoryCache {
    backend: FileBackend,
    ttl: u64,
}

impl DirectoryCache {
    /// Cache stored in `root/<name>`
    pub fn new(root: impl AsRef<Path>, name: &str) -> Result<Self> {
        FilenameValidator::new("directory")
            .validate(name)
            .map_err(|e| CacheError::configuration("file", e.to_string()))?;

        Ok(Self {
            backend: FileBackend::new(root.as_ref().join(name)),
            ttl: DEFAULT_DIRECTORY_TTL,
        })
    }

    /// Entry lifetime, raised to [`MINIMUM_TTL`] if shorter
    pub fn with_ttl(mut self, ttl: u64) -> Self {
        if ttl < MINIMUM_TTL {
            debug!(requested = ttl, applied = MINIMUM_TTL, "Raised directory cache TTL");
        }
        self.ttl = ttl.max(MINIMUM_TTL);
        self
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    pub fn directory(&self) -> &Path {
        self.backend.directory()
    }

    /// Path of the file holding `id`
    pub fn path_for(&self, id: &str) -> Result<PathBuf> {
        let key = CacheKey::new(id)?;
        self.backend
            .path_for(key.as_str())
            .ok_or_else(|| CacheError::InvalidKey {
                key: id.to_string(),
                reason: "not a plain file name".to_string(),
            })
    }

    pub fn get<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>> {
        let key = CacheKey::new(id)?;
        Ok(self
            .backend
            .fetch(key.as_str())
            .and_then(|payload| serde_json::from_value(payload).ok()))
    }

    pub fn set<T: Serialize + ?Sized>(&self, id: &str, value: &T) -> Result<bool> {
        let key = CacheKey::new(id)?;
        let Ok(payload) = serde_json::to_value(value) else {
            return Ok(false);
        };
        Ok(self.backend.save(key.as_str(), &payload, self.ttl))
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        let key = CacheKey::new(id)?;
        Ok(self.backend.delete(key.as_str()))
    }

    /// Remove every entry and run the delete callbacks once
    pub fn delete_all(&self) -> bool {
        self.backend.flush()
    }

    /// Run `callback` after each [`delete_all`](Self::delete_all)
    pub fn add_on_delete_callback(&self, callback: FlushObserver) {
        self.backend.add_flush_observer(callback);
    }
}

impl std::fmt::Debug for DirectoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryCache")
            .field("directory", &self.directory())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_ttl_floor() {
        let dir = TempDir::new().unwrap();
        let cache = DirectoryCache::new(dir.path(), "settings").unwrap();
        assert_eq!(cache.ttl(), DEFAULT_DIRECTORY_TTL);
        assert_eq!(cache.with_ttl(5).ttl(), MINIMUM_TTL);

        let cache = DirectoryCache::new(dir.path(), "settings").unwrap().with_ttl(3600);
        assert_eq!(cache.ttl(), 3600);
    }

    #[test]
    fn test_round_trip_in_subdirectory() {
        let dir = TempDir::new().unwrap();
        let cache = DirectoryCache::new(dir.path(), "plugins").unwrap();

        assert!(cache.set("enabled", &vec!["a", "b"]).unwrap());
        assert_eq!(
            cache.get::<Vec<String>>("enabled").unwrap(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert!(cache.path_for("enabled").unwrap().starts_with(dir.path().join("plugins")));
        assert!(cache.delete("enabled").unwrap());
        assert_eq!(cache.get::<Vec<String>>("enabled").unwrap(), None);
    }

    #[test]
    fn test_rejects_bad_names() {
        let dir = TempDir::new().unwrap();
        assert!(DirectoryCache::new(dir.path(), "../up").is_err());
        let cache = DirectoryCache::new(dir.path(), "ok").unwrap();
        assert!(matches!(cache.get::<i32>("a/b"), Err(CacheError::InvalidKey { .. })));
    }

    #[test]
    fn test_delete_all_runs_callbacks() {
        let dir = TempDir::new().unwrap();
        let cache = DirectoryCache::new(dir.path(), "settings").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        cache.add_on_delete_callback(Arc::new(move |_: &Path| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        cache.set("a", &1).unwrap();
        cache.set("b", &2).unwrap();
        assert!(cache.delete_all());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get::<i32>("a").unwrap(), None);
    }
}
