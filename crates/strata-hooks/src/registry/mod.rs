//! Hook registry for lifecycle callbacks
//!
//! The registry maps event names to callbacks. It knows nothing about
//! requests; "at most once per request" is enforced by
//! [`RequestLifecycle`](crate::RequestLifecycle), which sits on top of it.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use strata_hooks::{HookRegistry, InMemoryHookRegistry};
//!
//! let registry = InMemoryHookRegistry::new();
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&calls);
//!
//! registry.on("Tracker.end", Arc::new(move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! }))?;
//!
//! assert_eq!(registry.dispatch("Tracker.end"), 1);
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! # Ok::<(), strata_hooks::HooksError>(())
//! ```

mod storage;

use std::sync::Arc;

pub use storage::InMemoryHookRegistry;

use crate::error::Result;

/// Callback run when an event fires
pub type HookCallback = Arc<dyn Fn() + Send + Sync>;

/// Trait for registering and dispatching lifecycle callbacks
///
/// All implementations must be thread-safe (`Send + Sync`) since a registry is
/// shared by every cache that defers work to the end of a request.
pub trait HookRegistry: Send + Sync {
    /// Register `callback` for `event` and return its hook ID
    ///
    /// # Errors
    ///
    /// Returns [`HooksError::InvalidEvent`](crate::HooksError::InvalidEvent)
    /// if the event name is blank.
    fn on(&self, event: &str, callback: HookCallback) -> Result<String>;

    /// Remove a hook by ID
    fn remove(&self, hook_id: &str) -> Result<()>;

    /// Number of hooks registered for `event`
    fn hooks_for_event(&self, event: &str) -> usize;

    /// Run every hook registered for `event` in registration order
    ///
    /// Returns the number of callbacks invoked.
    fn dispatch(&self, event: &str) -> usize;
}
