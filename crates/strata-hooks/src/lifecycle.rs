//! Per-request event firing
//!
//! A [`RequestLifecycle`] wraps a [`HookRegistry`] and guarantees that each
//! event is dispatched at most once between two calls to
//! [`begin_request`](RequestLifecycle::begin_request).

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::registry::HookRegistry;

#[derive(Debug, Default)]
struct RequestState {
    request: u64,
    fired: HashSet<String>,
}

/// Tracks which events already fired during the current request
pub struct RequestLifecycle {
    registry: Arc<dyn HookRegistry>,
    state: Mutex<RequestState>,
}

impl RequestLifecycle {
    pub fn new(registry: Arc<dyn HookRegistry>) -> Self {
        Self {
            registry,
            state: Mutex::new(RequestState::default()),
        }
    }

    pub fn registry(&self) -> &Arc<dyn HookRegistry> {
        &self.registry
    }

    /// Sequence number of the current request, starting at 0
    pub fn current_request(&self) -> u64 {
        self.state.lock().request
    }

    /// Start a new request; every event may fire again.
    pub fn begin_request(&self) -> u64 {
        let mut state = self.state.lock();
        state.request += 1;
        state.fired.clear();
        state.request
    }

    /// Whether `event` already fired during the current request
    pub fn has_fired(&self, event: &str) -> bool {
        self.state.lock().fired.contains(event)
    }

    /// Dispatch `event` unless it already fired during this request.
    ///
    /// Returns the number of callbacks invoked, or `None` when the event was
    /// suppressed as a repeat.
    pub fn fire(&self, event: &str) -> Option<usize> {
        let request = {
            let mut state = self.state.lock();
            if !state.fired.insert(event.to_string()) {
                debug!(event, request = state.request, "Event already fired for this request");
                return None;
            }
            state.request
        };

        let invoked = self.registry.dispatch(event);
        debug!(event, request, invoked, "Fired lifecycle event");
        Some(invoked)
    }

    /// Fire `event` for the current request and start the next one.
    pub fn end_request(&self, event: &str) -> Option<usize> {
        let invoked = self.fire(event);
        self.begin_request();
        invoked
    }
}

impl std::fmt::Debug for RequestLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLifecycle")
            .field("state", &*self.state.lock())
            .finish()
    }
}
