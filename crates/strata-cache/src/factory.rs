//! Backend factory and instance registry
//!
//! The factory turns a backend type name plus an option table into an
//! `Arc<dyn Backend>` and memoizes the result by `(type, canonical options)`,
//! so every caller asking for the same configuration shares one instance for
//! the factory's lifetime.
//!
//! Built-in types are `array`, `file`, `chained` and `null`. Any other type is
//! offered to the providers registered with
//! [`register_provider`](BackendFactory::register_provider), then to linked
//! [`BackendPlugin`](crate::plugin::BackendPlugin)s.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::{
    Backend, BackendOptions, BlackHoleBackend, ChainedBackend, FileBackend, InMemoryBackend,
    DEFAULT_PROMOTION_TTL,
};
use crate::error::{CacheError, Result};
use crate::plugin;
use crate::settings::CacheSettings;

/// In-memory backend type name
pub const ARRAY: &str = "array";
/// File backend type name
pub const FILE: &str = "file";
/// Chained backend type name
pub const CHAINED: &str = "chained";
/// Black hole backend type name
pub const NULL: &str = "null";

/// Supplies backends for types the factory does not build itself
///
/// Returning `Ok(None)` declines; the factory then tries linked plugins.
pub trait BackendProvider: Send + Sync {
    fn build(&self, backend_type: &str, options: &BackendOptions)
        -> Result<Option<Arc<dyn Backend>>>;
}

impl<F> BackendProvider for F
where
    F: Fn(&str, &BackendOptions) -> Result<Option<Arc<dyn Backend>>> + Send + Sync,
{
    fn build(
        &self,
        backend_type: &str,
        options: &BackendOptions,
    ) -> Result<Option<Arc<dyn Backend>>> {
        self(backend_type, options)
    }
}

/// Builds and memoizes backends
pub struct BackendFactory {
    options: HashMap<String, BackendOptions>,
    promotion_ttl: u64,
    providers: RwLock<HashMap<String, Arc<dyn BackendProvider>>>,
    instances: Mutex<HashMap<String, Arc<dyn Backend>>>,
}

impl Default for BackendFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendFactory {
    /// Factory with no configured options
    pub fn new() -> Self {
        Self {
            options: HashMap::new(),
            promotion_ttl: DEFAULT_PROMOTION_TTL,
            providers: RwLock::new(HashMap::new()),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Factory using the per-type option tables from `settings`
    pub fn from_settings(settings: &CacheSettings) -> Self {
        let mut factory = Self::new();
        factory.promotion_ttl = settings.promotion_ttl;
        for (backend_type, options) in &settings.backends {
            factory
                .options
                .insert(backend_type.clone(), options.clone());
        }
        factory
    }

    /// Set the option table used by [`build`](Self::build) for `backend_type`
    pub fn with_options(mut self, backend_type: impl Into<String>, options: BackendOptions) -> Self {
        self.options.insert(backend_type.into(), options);
        self
    }

    pub fn with_promotion_ttl(mut self, ttl: u64) -> Self {
        self.promotion_ttl = ttl;
        self
    }

    /// Configured options for `backend_type`
    pub fn options_for(&self, backend_type: &str) -> BackendOptions {
        self.options.get(backend_type).cloned().unwrap_or_default()
    }

    /// Register a provider for a backend type this factory does not know
    ///
    /// Replaces any provider previously registered for the same type.
    pub fn register_provider(&self, backend_type: impl Into<String>, provider: Arc<dyn BackendProvider>) {
        let backend_type = backend_type.into();
        debug!(backend_type = %backend_type, "Registered backend provider");
        self.providers.write().insert(backend_type, provider);
    }

    /// Number of memoized instances
    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }

    /// Build `backend_type` with its configured options
    pub fn build(&self, backend_type: &str) -> Result<Arc<dyn Backend>> {
        let options = self.options_for(backend_type);
        self.build_with(backend_type, &options)
    }

    /// Build `backend_type` with explicit options
    pub fn build_with(&self, backend_type: &str, options: &BackendOptions) -> Result<Arc<dyn Backend>> {
        if backend_type.trim().is_empty() {
            return Err(CacheError::UnknownBackend {
                backend_type: backend_type.to_string(),
            });
        }

        let key = memo_key(backend_type, options);
        if let Some(existing) = self.instances.lock().get(&key) {
            return Ok(Arc::clone(existing));
        }

        // Constructed without the lock held: chained children recurse into the factory.
        let backend = self.construct(backend_type, options)?;

        let mut instances = self.instances.lock();
        let backend = Arc::clone(instances.entry(key).or_insert(backend));
        info!(backend_type, kind = backend.kind(), "Built cache backend");
        Ok(backend)
    }

    fn construct(&self, backend_type: &str, options: &BackendOptions) -> Result<Arc<dyn Backend>> {
        match backend_type {
            ARRAY => Ok(Arc::new(InMemoryBackend::new())),
            NULL => Ok(Arc::new(BlackHoleBackend::new())),
            FILE => {
                let directory = required_str(FILE, options, "directory")?;
                let invalidate = optional_bool(FILE, options, "invalidate_before_read")?;
                Ok(Arc::new(
                    FileBackend::new(directory).with_invalidate_before_read(invalidate.unwrap_or(false)),
                ))
            }
            CHAINED => self.construct_chained(options),
            other => self.construct_external(other, options),
        }
    }

    fn construct_chained(&self, options: &BackendOptions) -> Result<Arc<dyn Backend>> {
        let children = match options.get("backends") {
            Some(Value::Array(children)) => children,
            Some(_) => {
                return Err(CacheError::configuration(
                    CHAINED,
                    "option 'backends' must be a list of backend types",
                ))
            }
            None => return Err(CacheError::configuration(CHAINED, "missing option 'backends'")),
        };
        if children.is_empty() {
            return Err(CacheError::configuration(CHAINED, "option 'backends' is empty"));
        }

        let mut tiers = Vec::with_capacity(children.len());
        for child in children {
            let Some(child) = child.as_str() else {
                return Err(CacheError::configuration(
                    CHAINED,
                    format!("backend type must be a string, got {child}"),
                ));
            };
            if child == CHAINED {
                return Err(CacheError::configuration(
                    CHAINED,
                    "a chained backend cannot contain another chained backend",
                ));
            }
            tiers.push(self.build(child)?);
        }

        let promotion_ttl = optional_u64(CHAINED, options, "promotion_ttl")?.unwrap_or(self.promotion_ttl);
        Ok(Arc::new(
            ChainedBackend::new(tiers).with_promotion_ttl(promotion_ttl),
        ))
    }

    fn construct_external(&self, backend_type: &str, options: &BackendOptions) -> Result<Arc<dyn Backend>> {
        let provider = self.providers.read().get(backend_type).cloned();
        if let Some(provider) = provider {
            if let Some(backend) = provider.build(backend_type, options)? {
                return Ok(backend);
            }
            debug!(backend_type, "Provider declined backend type");
        }

        for plugin in plugin::plugins_for(backend_type) {
            if let Some(backend) = (plugin.build_fn)(options)? {
                return Ok(backend);
            }
        }

        Err(CacheError::UnknownBackend {
            backend_type: backend_type.to_string(),
        })
    }
}

impl std::fmt::Debug for BackendFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendFactory")
            .field("options", &self.options)
            .field("promotion_ttl", &self.promotion_ttl)
            .field("providers", &self.providers.read().keys().collect::<Vec<_>>())
            .field("instances", &self.instance_count())
            .finish()
    }
}

fn required_str<'a>(backend_type: &str, options: &'a BackendOptions, name: &str) -> Result<&'a str> {
    match options.get(name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        Some(Value::String(_)) => Err(CacheError::configuration(
            backend_type,
            format!("option '{name}' is empty"),
        )),
        Some(other) => Err(CacheError::configuration(
            backend_type,
            format!("option '{name}' must be a string, got {other}"),
        )),
        None => Err(CacheError::configuration(
            backend_type,
            format!("missing option '{name}'"),
        )),
    }
}

fn optional_bool(backend_type: &str, options: &BackendOptions, name: &str) -> Result<Option<bool>> {
    match options.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) => s.parse().map(Some).map_err(|_| {
            CacheError::configuration(backend_type, format!("option '{name}' must be a boolean"))
        }),
        Some(_) => Err(CacheError::configuration(
            backend_type,
            format!("option '{name}' must be a boolean"),
        )),
    }
}

fn optional_u64(backend_type: &str, options: &BackendOptions, name: &str) -> Result<Option<u64>> {
    match options.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
            .map(Some)
            .ok_or_else(|| {
                CacheError::configuration(
                    backend_type,
                    format!("option '{name}' must be a non-negative integer"),
                )
            }),
    }
}

/// Memo key: type plus options serialized with sorted object keys
fn memo_key(backend_type: &str, options: &BackendOptions) -> String {
    let mut canonical = canonicalize(&Value::Object(options.clone()));
    if backend_type == FILE {
        if let Some(Value::String(dir)) = canonical.get_mut("directory") {
            *dir = normalize_directory(dir);
        }
    }
    format!("{backend_type}:{canonical}")
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn normalize_directory(dir: &str) -> String {
    Path::new(dir)
        .components()
        .collect::<PathBuf>()
        .to_string_lossy()
        .into_owned()
}
