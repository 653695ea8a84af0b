//! Aggregated cache
//!
//! A [`MultiCache`] keeps many small logical entries in one in-process map
//! that is backed by a single physical cache record per (version, namespace,
//! mode). The
//! record is read on first use, and written back at most once per request,
//! when the mode's lifecycle event fires, and only if something changed.
//!
//! ```text
//! Unpopulated --first get/has/set/delete--> Populated(clean)
//! Populated(clean) --set / effective delete--> Populated(dirty)
//! Populated(dirty) --persist (save ok)--> Populated(clean)
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_hooks::{events, HookRegistry};
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::error::Result;
use crate::key::{validate_version, Namespace};

/// Lifetime in seconds of the aggregated record (12 hours)
pub const MULTI_CACHE_TTL: u64 = 43_200;

/// Kind of request the aggregated cache serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Tracking requests
    #[default]
    Tracker,
    /// Interactive requests
    Ui,
}

impl CacheMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheMode::Tracker => "tracker",
            CacheMode::Ui => "ui",
        }
    }

    /// Lifecycle event after which the aggregate is persisted
    pub fn persist_event(&self) -> &'static str {
        match self {
            CacheMode::Tracker => events::TRACKER_END,
            CacheMode::Ui => events::REQUEST_DISPATCH_END,
        }
    }
}

impl std::fmt::Display for CacheMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct Aggregate {
    entries: HashMap<String, Value>,
    dirty: bool,
}

/// Builder for [`MultiCache`]
pub struct MultiCacheBuilder {
    backend: Arc<dyn Backend>,
    mode: CacheMode,
    version: String,
    namespace: String,
    ttl: u64,
    hooks: Option<Arc<dyn HookRegistry>>,
}

impl MultiCacheBuilder {
    pub fn new(backend: Arc<dyn Backend>, mode: CacheMode) -> Self {
        Self {
            backend,
            mode,
            version: env!("CARGO_PKG_VERSION").to_string(),
            namespace: String::new(),
            ttl: MULTI_CACHE_TTL,
            hooks: None,
        }
    }

    /// Application version; a new version starts from an empty aggregate
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Partition; caches in different namespaces keep separate records
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn ttl(mut self, ttl: u64) -> Self {
        self.ttl = ttl;
        self
    }

    /// Registry the persist callback is attached to on population
    pub fn hooks(mut self, hooks: Arc<dyn HookRegistry>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn build(self) -> Result<Arc<MultiCache>> {
        validate_version(&self.version)?;
        let namespace = Namespace::new(self.namespace)?;
        let cache_id = aggregate_id(&self.version, &namespace, self.mode);

        Ok(Arc::new_cyclic(|this| MultiCache {
            backend: self.backend,
            mode: self.mode,
            cache_id,
            ttl: self.ttl,
            hooks: self.hooks,
            state: Mutex::new(None),
            hook_id: Mutex::new(None),
            this: this.clone(),
        }))
    }
}

/// Physical id of the aggregated record
///
/// The mode is always the last `-` segment and the stripped version has no
/// `-`, so a namespace in between cannot make two ids collide.
fn aggregate_id(version: &str, namespace: &Namespace, mode: CacheMode) -> String {
    let version: String = version.chars().filter(|c| *c != '.' && *c != '-').collect();
    if namespace.is_default() {
        format!("multicache-{version}-{}", mode.as_str())
    } else {
        format!("multicache-{version}-{namespace}-{}", mode.as_str())
    }
}

/// Many logical entries stored as one backend record
pub struct MultiCache {
    backend: Arc<dyn Backend>,
    mode: CacheMode,
    cache_id: String,
    ttl: u64,
    hooks: Option<Arc<dyn HookRegistry>>,
    state: Mutex<Option<Aggregate>>,
    hook_id: Mutex<Option<String>>,
    this: Weak<MultiCache>,
}

impl MultiCache {
    pub fn builder(backend: Arc<dyn Backend>, mode: CacheMode) -> MultiCacheBuilder {
        MultiCacheBuilder::new(backend, mode)
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    /// Id of the backing record
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn is_populated(&self) -> bool {
        self.state.lock().is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.state
            .lock()
            .as_ref()
            .map(|aggregate| aggregate.dirty)
            .unwrap_or(false)
    }

    /// Number of logical entries; populates the aggregate
    pub fn len(&self) -> usize {
        self.with_aggregate(|aggregate| aggregate.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.with_aggregate(|aggregate| aggregate.entries.get(id).cloned())
    }

    pub fn has(&self, id: &str) -> bool {
        self.with_aggregate(|aggregate| aggregate.entries.contains_key(id))
    }

    /// Insert or overwrite `id`; the aggregate becomes dirty
    pub fn set(&self, id: impl Into<String>, value: Value) -> bool {
        let id = id.into();
        self.with_aggregate(|aggregate| {
            aggregate.entries.insert(id, value);
            aggregate.dirty = true;
        });
        true
    }

    /// Remove `id`; the aggregate becomes dirty only if something was removed
    pub fn delete(&self, id: &str) -> bool {
        self.with_aggregate(|aggregate| {
            let removed = aggregate.entries.remove(id).is_some();
            if removed {
                aggregate.dirty = true;
            }
            removed
        })
    }

    /// Write the aggregate back if it changed since the last write
    ///
    /// Returns whether a write happened. A failed write keeps the aggregate
    /// dirty.
    pub fn persist(&self) -> bool {
        let mut state = self.state.lock();
        let Some(aggregate) = state.as_mut() else {
            return false;
        };
        if !aggregate.dirty {
            debug!(cache_id = %self.cache_id, "Aggregate clean, nothing to persist");
            return false;
        }

        let payload = Value::Object(
            aggregate
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );

        if self.backend.save(&self.cache_id, &payload, self.ttl) {
            aggregate.dirty = false;
            info!(
                cache_id = %self.cache_id,
                entries = aggregate.entries.len(),
                "Persisted aggregated cache"
            );
            true
        } else {
            warn!(cache_id = %self.cache_id, "Failed to persist aggregated cache");
            false
        }
    }

    /// Clear every logical entry and flush the backing backend
    pub fn flush_all(&self) -> bool {
        if let Some(aggregate) = self.state.lock().as_mut() {
            aggregate.entries.clear();
            aggregate.dirty = false;
        }
        self.backend.flush()
    }

    fn with_aggregate<R>(&self, f: impl FnOnce(&mut Aggregate) -> R) -> R {
        let mut state = self.state.lock();
        let populated_now = state.is_none();
        let aggregate = state.get_or_insert_with(|| self.load());
        let result = f(aggregate);
        drop(state);

        if populated_now {
            self.register_persist_hook();
        }
        result
    }

    fn load(&self) -> Aggregate {
        let entries = match self.backend.fetch(&self.cache_id) {
            Some(Value::Object(map)) => map.into_iter().collect(),
            Some(_) => {
                debug!(cache_id = %self.cache_id, "Aggregated record malformed, starting empty");
                HashMap::new()
            }
            None => HashMap::new(),
        };
        debug!(cache_id = %self.cache_id, entries = entries.len(), "Populated aggregated cache");
        Aggregate {
            entries,
            dirty: false,
        }
    }

    fn register_persist_hook(&self) {
        let Some(hooks) = &self.hooks else {
            return;
        };
        let mut hook_id = self.hook_id.lock();
        if hook_id.is_some() {
            return;
        }

        let this = self.this.clone();
        let event = self.mode.persist_event();
        match hooks.on(
            event,
            Arc::new(move || {
                if let Some(cache) = this.upgrade() {
                    cache.persist();
                }
            }),
        ) {
            Ok(id) => {
                debug!(cache_id = %self.cache_id, event, "Registered aggregate persist hook");
                *hook_id = Some(id);
            }
            Err(e) => warn!(cache_id = %self.cache_id, error = %e, "Cannot register persist hook"),
        }
    }
}

impl Drop for MultiCache {
    fn drop(&mut self) {
        if let (Some(hooks), Some(id)) = (&self.hooks, self.hook_id.get_mut().take()) {
            let _ = hooks.remove(&id);
        }
    }
}

impl std::fmt::Debug for MultiCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiCache")
            .field("cache_id", &self.cache_id)
            .field("mode", &self.mode)
            .field("ttl", &self.ttl)
            .field("populated", &self.is_populated())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}
