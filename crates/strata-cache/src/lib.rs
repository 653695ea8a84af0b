//! # Strata Cache
//!
//! A pluggable caching layer for request-driven applications.
//!
//! ## Features
//!
//! - **Interchangeable backends**: in-memory, on-disk, no-op and tiered
//!   ([`backend`]), all behind one [`Backend`] trait
//! - **Atomic file storage**: entries are replaced by rename, so readers never
//!   observe a partial write
//! - **Read-through tiers**: [`ChainedBackend`] promotes hits into faster tiers
//! - **Memoized construction**: [`BackendFactory`] shares one instance per
//!   configuration and accepts externally supplied backend types
//! - **Namespaced facade**: [`Cache`] validates keys and partitions them
//! - **Aggregated cache**: [`MultiCache`] batches many small entries into one
//!   record written at most once per request
//!
//! ## Example
//!
//! ```
//! use strata_cache::{BackendFactory, Cache};
//!
//! let factory = BackendFactory::new();
//! let cache = Cache::new(factory.build("array")?);
//! cache.set("greeting", "hello")?;
//! assert_eq!(cache.get::<String>("greeting")?, Some("hello".to_string()));
//! # Ok::<(), strata_cache::CacheError>(())
//! ```

pub mod backend;
pub mod cache;
pub mod context;
pub mod directory;
pub mod error;
pub mod factory;
pub mod key;
pub mod multi;
pub mod plugin;
pub mod settings;
pub mod transient;

pub use backend::{
    Backend, BackendOptions, BackendStats, BlackHoleBackend, ChainedBackend, FileBackend,
    InMemoryBackend, InstrumentedBackend,
};
pub use cache::Cache;
pub use context::CacheContext;
pub use directory::DirectoryCache;
pub use error::{CacheError, Result};
pub use factory::{BackendFactory, BackendProvider};
pub use key::{CacheKey, Namespace, NamespacedKey};
pub use multi::{CacheMode, MultiCache, MultiCacheBuilder};
pub use plugin::BackendPlugin;
pub use settings::{CacheSettings, SettingsLoader};
pub use transient::TransientCache;
