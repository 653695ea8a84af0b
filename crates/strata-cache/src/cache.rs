//! Namespaced cache facade
//!
//! [`Cache`] validates caller keys, prefixes them with the application version
//! and namespace, and delegates to a [`Backend`]. An invalid key is a
//! programming error and fails with [`CacheError::InvalidKey`] before the
//! backend is touched; everything else the backend reports as a plain miss or
//! `false`.
//!
//! ```
//! use std::sync::Arc;
//! use strata_cache::{Cache, InMemoryBackend};
//!
//! let cache = Cache::new(Arc::new(InMemoryBackend::new())).with_namespace("reports")?;
//! cache.set("daily", &vec![1, 2, 3])?;
//! assert_eq!(cache.get::<Vec<i32>>("daily")?, Some(vec![1, 2, 3]));
//! # Ok::<(), strata_cache::CacheError>(())
//! ```

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::Result;
use crate::key::{validate_version, CacheKey, Namespace, NamespacedKey};

/// Cache facade over a backend
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn Backend>,
    namespace: Namespace,
    version: String,
    default_ttl: u64,
}

impl Cache {
    /// Facade in the default namespace, keyed by this crate's version
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            namespace: Namespace::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            default_ttl: 0,
        }
    }

    pub fn with_namespace(mut self, namespace: &str) -> Result<Self> {
        self.set_namespace(namespace)?;
        Ok(self)
    }

    /// Version embedded in every key; changing it orphans old entries
    pub fn with_version(mut self, version: impl Into<String>) -> Result<Self> {
        let version = version.into();
        validate_version(&version)?;
        self.version = version;
        Ok(self)
    }

    /// TTL in seconds used by [`set`](Self::set) and [`save`](Self::save)
    pub fn with_default_ttl(mut self, ttl: u64) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Switch partition. Entries of the previous namespace are left in place.
    pub fn set_namespace(&mut self, namespace: &str) -> Result<()> {
        self.namespace = Namespace::new(namespace)?;
        Ok(())
    }

    pub fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    fn id(&self, key: &str) -> Result<NamespacedKey> {
        let key = CacheKey::new(key)?;
        Ok(NamespacedKey::compose(&self.version, &self.namespace, &key))
    }

    /// Raw payload for `key`
    pub fn fetch(&self, key: &str) -> Result<Option<Value>> {
        let id = self.id(key)?;
        Ok(self.backend.fetch(id.as_str()))
    }

    pub fn has(&self, key: &str) -> Result<bool> {
        let id = self.id(key)?;
        Ok(self.backend.contains(id.as_str()))
    }

    /// Store a raw payload with the default TTL
    pub fn save(&self, key: &str, payload: &Value) -> Result<bool> {
        self.save_with_ttl(key, payload, self.default_ttl)
    }

    pub fn save_with_ttl(&self, key: &str, payload: &Value, ttl: u64) -> Result<bool> {
        let id = self.id(key)?;
        Ok(self.backend.save(id.as_str(), payload, ttl))
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        let id = self.id(key)?;
        Ok(self.backend.delete(id.as_str()))
    }

    /// Typed read; a payload that does not decode as `T` is a miss
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(payload) = self.fetch(key)? else {
            return Ok(None);
        };
        match serde_json::from_value(payload) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                debug!(key, error = %e, "Cached payload has unexpected shape");
                Ok(None)
            }
        }
    }

    /// Typed write with the default TTL
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<bool> {
        self.set_with_ttl(key, value, self.default_ttl)
    }

    /// Typed write; a value that cannot be encoded is not stored
    pub fn set_with_ttl<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: u64) -> Result<bool> {
        let id = self.id(key)?;
        match serde_json::to_value(value) {
            Ok(payload) => Ok(self.backend.save(id.as_str(), &payload, ttl)),
            Err(e) => {
                warn!(key, error = %e, "Cannot encode value for cache");
                Ok(false)
            }
        }
    }

    /// Remove everything in the backend, across all namespaces
    pub fn flush_all(&self) -> bool {
        self.backend.flush()
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("backend", &self.backend.kind())
            .field("namespace", &self.namespace)
            .field("version", &self.version)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
