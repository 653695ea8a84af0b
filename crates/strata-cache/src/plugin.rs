//! Link-time backend registration
//!
//! Crates that ship a backend type the factory does not know can submit a
//! [`BackendPlugin`] through `inventory`. The factory consults plugins after
//! explicitly registered providers.
//!
//! ```rust,ignore
//! use strata_cache::plugin::BackendPlugin;
//!
//! inventory::submit! {
//!     BackendPlugin::new("redis", build_redis_backend)
//! }
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::backend::{Backend, BackendOptions};
use crate::error::Result;

/// Constructor signature for plugin backends
///
/// Returning `Ok(None)` declines the request and lets the next plugin try.
pub type PluginBuildFn = fn(&BackendOptions) -> Result<Option<Arc<dyn Backend>>>;

/// A backend type contributed at link time
pub struct BackendPlugin {
    /// Backend type name as used in settings
    pub backend_type: &'static str,

    /// Constructor
    pub build_fn: PluginBuildFn,

    /// Lower values are consulted first (default 100)
    pub priority: u32,
}

impl BackendPlugin {
    pub const fn new(backend_type: &'static str, build_fn: PluginBuildFn) -> Self {
        Self {
            backend_type,
            build_fn,
            priority: 100,
        }
    }

    pub const fn with_priority(
        backend_type: &'static str,
        build_fn: PluginBuildFn,
        priority: u32,
    ) -> Self {
        Self {
            backend_type,
            build_fn,
            priority,
        }
    }
}

inventory::collect!(BackendPlugin);

/// All linked plugins, ordered by priority
pub fn discovered_plugins() -> Vec<&'static BackendPlugin> {
    let mut plugins: Vec<&'static BackendPlugin> = inventory::iter::<BackendPlugin>().collect();
    plugins.sort_by_key(|p| p.priority);
    plugins
}

/// Plugins that serve `backend_type`, ordered by priority
pub(crate) fn plugins_for(backend_type: &str) -> Vec<&'static BackendPlugin> {
    let plugins: Vec<_> = discovered_plugins()
        .into_iter()
        .filter(|p| p.backend_type == backend_type)
        .collect();
    debug!(backend_type, plugins = plugins.len(), "Looked up backend plugins");
    plugins
}

/// Backend type names contributed by linked plugins
pub fn list_discovered_plugins() -> Vec<&'static str> {
    discovered_plugins().iter().map(|p| p.backend_type).collect()
}
