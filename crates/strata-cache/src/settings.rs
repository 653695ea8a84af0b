//! Cache settings and their loading
//!
//! Settings come from three layers, later ones winning: built-in defaults, an
//! optional TOML file, and `STRATA_*` environment variables. Nested keys use a
//! double underscore, e.g. `STRATA_BACKENDS__FILE__DIRECTORY=/var/cache/app`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::backend::{BackendOptions, DEFAULT_PROMOTION_TTL};
use crate::error::{CacheError, Result};
use crate::factory::{CHAINED, FILE};
use crate::key::{validate_version, Namespace};
use crate::multi::{CacheMode, MULTI_CACHE_TTL};

/// Default directory of the file backend, relative to the working directory
pub const DEFAULT_FILE_DIRECTORY: &str = "tmp/cache/tracker";

/// Default environment variable prefix
pub const DEFAULT_ENV_PREFIX: &str = "STRATA";

/// Caching layer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Backend type used by the persistent cache
    pub backend: String,
    /// Namespace of the persistent cache; empty for the default partition
    pub namespace: String,
    /// Application version embedded in every key
    pub version: String,
    /// TTL in seconds for facade writes without an explicit TTL (0 = never)
    pub default_ttl: u64,
    /// TTL in seconds of values promoted into faster chain tiers
    pub promotion_ttl: u64,
    /// TTL in seconds of the aggregated record
    pub multi_cache_ttl: u64,
    /// Request mode of the aggregated cache
    pub mode: CacheMode,
    /// Option table per backend type
    pub backends: BTreeMap<String, BackendOptions>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let mut backends = BTreeMap::new();
        backends.insert(FILE.to_string(), object(json!({ "directory": DEFAULT_FILE_DIRECTORY })));
        backends.insert(CHAINED.to_string(), object(json!({ "backends": ["array", "file"] })));

        Self {
            backend: FILE.to_string(),
            namespace: String::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            default_ttl: 0,
            promotion_ttl: DEFAULT_PROMOTION_TTL,
            multi_cache_ttl: MULTI_CACHE_TTL,
            mode: CacheMode::default(),
            backends,
        }
    }
}

fn object(value: Value) -> BackendOptions {
    match value {
        Value::Object(map) => map,
        _ => BackendOptions::new(),
    }
}

impl CacheSettings {
    /// Check the settings without building anything
    pub fn validate(&self) -> Result<()> {
        if self.backend.trim().is_empty() {
            return Err(CacheError::Settings("backend type must not be empty".to_string()));
        }

        Namespace::new(self.namespace.as_str())?;
        validate_version(&self.version)?;

        if self.multi_cache_ttl == 0 {
            debug!("multi_cache_ttl is 0, the aggregated record never expires");
        }

        if let Some(chained) = self.backends.get(CHAINED) {
            match chained.get("backends") {
                Some(Value::Array(children)) if children.is_empty() => {
                    return Err(CacheError::configuration(CHAINED, "option 'backends' is empty"))
                }
                Some(Value::Array(_)) | None => {}
                Some(_) => {
                    return Err(CacheError::configuration(
                        CHAINED,
                        "option 'backends' must be a list of backend types",
                    ))
                }
            }
        }

        Ok(())
    }

    /// Option table for `backend_type`, empty if none is configured
    pub fn options_for(&self, backend_type: &str) -> BackendOptions {
        self.backends.get(backend_type).cloned().unwrap_or_default()
    }
}

/// Loads [`CacheSettings`] from defaults, a file and the environment
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    path: Option<PathBuf>,
    env_prefix: String,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self {
            path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Read `path` as well; a missing file is not an error
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn load(&self) -> Result<CacheSettings> {
        let defaults = Config::try_from(&CacheSettings::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = &self.path {
            debug!(path = %path.display(), "Reading cache settings file");
            builder = builder.add_source(File::from(path.clone()).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__"),
        );

        let settings: CacheSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}
