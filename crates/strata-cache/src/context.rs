//! Composition root for the caching layer
//!
//! A [`CacheContext`] owns everything that would otherwise be process-wide:
//! the backend factory, the persistent cache, the transient cache and the
//! aggregated cache for the configured mode. Applications create one per
//! process (or per test) and pass it around.

use std::sync::Arc;

use strata_hooks::HookRegistry;
use tracing::{debug, info};

use crate::cache::Cache;
use crate::error::Result;
use crate::factory::BackendFactory;
use crate::multi::MultiCache;
use crate::settings::CacheSettings;
use crate::transient::TransientCache;

pub struct CacheContext {
    settings: CacheSettings,
    factory: Arc<BackendFactory>,
    hooks: Arc<dyn HookRegistry>,
    persistent: Cache,
    transient: Arc<TransientCache>,
    multi: Arc<MultiCache>,
    transient_hook: Option<String>,
}

impl CacheContext {
    /// Build every cache from `settings` with a fresh factory
    pub fn new(settings: CacheSettings, hooks: Arc<dyn HookRegistry>) -> Result<Self> {
        let factory = Arc::new(BackendFactory::from_settings(&settings));
        Self::with_factory(settings, factory, hooks)
    }

    /// Build every cache through an existing factory
    ///
    /// Use this to share memoized backends, or to register providers for
    /// custom backend types before the caches are built.
    pub fn with_factory(
        settings: CacheSettings,
        factory: Arc<BackendFactory>,
        hooks: Arc<dyn HookRegistry>,
    ) -> Result<Self> {
        settings.validate()?;

        let backend = factory.build(&settings.backend)?;
        let persistent = Cache::new(Arc::clone(&backend))
            .with_version(settings.version.clone())?
            .with_namespace(&settings.namespace)?
            .with_default_ttl(settings.default_ttl);

        let multi = MultiCache::builder(backend, settings.mode)
            .version(settings.version.clone())
            .namespace(settings.namespace.clone())
            .ttl(settings.multi_cache_ttl)
            .hooks(Arc::clone(&hooks))
            .build()?;

        let transient = Arc::new(TransientCache::new());
        let weak = Arc::downgrade(&transient);
        let transient_hook = hooks.on(
            settings.mode.persist_event(),
            Arc::new(move || {
                if let Some(transient) = weak.upgrade() {
                    transient.flush_all();
                }
            }),
        )?;

        info!(
            backend = %settings.backend,
            namespace = %settings.namespace,
            mode = %settings.mode,
            "Cache context ready"
        );

        Ok(Self {
            settings,
            factory,
            hooks,
            persistent,
            transient,
            multi,
            transient_hook: Some(transient_hook),
        })
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn factory(&self) -> &Arc<BackendFactory> {
        &self.factory
    }

    pub fn hooks(&self) -> &Arc<dyn HookRegistry> {
        &self.hooks
    }

    /// Persistent cache over the configured backend
    pub fn cache(&self) -> &Cache {
        &self.persistent
    }

    /// Request-scoped cache, cleared when the mode's lifecycle event fires
    pub fn transient(&self) -> &Arc<TransientCache> {
        &self.transient
    }

    /// Aggregated cache for the configured mode
    pub fn multi(&self) -> &Arc<MultiCache> {
        &self.multi
    }

    /// Flush the persistent, transient and aggregated caches
    pub fn flush_all(&self) -> bool {
        let persistent = self.persistent.flush_all();
        let transient = self.transient.flush_all();
        let multi = self.multi.flush_all();
        debug!(persistent, transient, multi, "Flushed all caches");
        persistent && transient && multi
    }
}

impl Drop for CacheContext {
    fn drop(&mut self) {
        if let Some(id) = self.transient_hook.take() {
            let _ = self.hooks.remove(&id);
        }
    }
}

impl std::fmt::Debug for CacheContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheContext")
            .field("settings", &self.settings)
            .field("persistent", &self.persistent)
            .field("transient", &self.transient)
            .field("multi", &self.multi)
            .finish()
    }
}
