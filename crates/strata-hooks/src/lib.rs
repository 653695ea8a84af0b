//! Strata request lifecycle hooks
//!
//! Caches that defer work to the end of a request (batched writes, clearing
//! request-scoped state) register callbacks here instead of relying on
//! process exit.
//!
//! - [`registry`]: event name to callback mapping ([`HookRegistry`])
//! - [`RequestLifecycle`]: fires each event at most once per request
//! - [`events`]: the event names used by the caching layer

pub mod error;
pub mod events;
pub mod lifecycle;
pub mod registry;

pub use error::{HooksError, Result};
pub use lifecycle::RequestLifecycle;
pub use registry::{HookCallback, HookRegistry, InMemoryHookRegistry};
