//! Cache keys, namespaces and their composition into backend ids

use std::fmt;

use strata_common::{FilenameValidator, Validator};

use crate::error::{CacheError, Result};

/// Separator between the components of a [`NamespacedKey`]
///
/// The filename grammar excludes it, so composition is injective.
pub const KEY_SEPARATOR: char = '~';

const KEY_PREFIX: &str = "strata";

/// A validated cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Validate `key` against the safe-filename grammar
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        FilenameValidator::new("key")
            .validate(key.as_str())
            .map_err(|e| CacheError::invalid_key(&key, e))?;
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cache partition; the empty namespace is the default partition
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(namespace: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        if !namespace.is_empty() {
            FilenameValidator::new("namespace")
                .validate(namespace.as_str())
                .map_err(|e| CacheError::InvalidNamespace {
                    namespace: namespace.clone(),
                    reason: e.to_string(),
                })?;
        }
        Ok(Self(namespace))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check that an application version can be embedded in a backend id
pub fn validate_version(version: &str) -> Result<()> {
    FilenameValidator::new("version")
        .validate(version)
        .map_err(|e| CacheError::InvalidVersion {
            version: version.to_string(),
            reason: e.to_string(),
        })
}

/// The id actually handed to a backend: `strata~<version>~<namespace>~<key>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespacedKey(String);

impl NamespacedKey {
    pub fn compose(version: &str, namespace: &Namespace, key: &CacheKey) -> Self {
        Self(format!(
            "{KEY_PREFIX}{sep}{version}{sep}{namespace}{sep}{key}",
            sep = KEY_SEPARATOR,
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespacedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
