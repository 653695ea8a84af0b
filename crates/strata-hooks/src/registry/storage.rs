//! In-memory hook storage implementation

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{HookCallback, HookRegistry};
use crate::error::{HooksError, Result};

struct RegisteredHook {
    id: String,
    event: String,
    callback: HookCallback,
}

/// In-memory hook registry implementation
#[derive(Clone, Default)]
pub struct InMemoryHookRegistry {
    hooks: Arc<RwLock<Vec<RegisteredHook>>>,
}

impl InMemoryHookRegistry {
    /// Create a new in-memory hook registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of registered hooks
    pub fn len(&self) -> usize {
        self.hooks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.read().is_empty()
    }
}

impl std::fmt::Debug for InMemoryHookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hooks = self.hooks.read();
        f.debug_struct("InMemoryHookRegistry")
            .field(
                "hooks",
                &hooks
                    .iter()
                    .map(|h| (h.id.as_str(), h.event.as_str()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl HookRegistry for InMemoryHookRegistry {
    fn on(&self, event: &str, callback: HookCallback) -> Result<String> {
        if event.trim().is_empty() {
            return Err(HooksError::InvalidEvent(event.to_string()));
        }

        let id = Uuid::new_v4().to_string();
        self.hooks.write().push(RegisteredHook {
            id: id.clone(),
            event: event.to_string(),
            callback,
        });

        debug!(hook_id = %id, event, "Registered lifecycle hook");
        Ok(id)
    }

    fn remove(&self, hook_id: &str) -> Result<()> {
        let mut hooks = self.hooks.write();
        let position = hooks
            .iter()
            .position(|h| h.id == hook_id)
            .ok_or_else(|| HooksError::HookNotFound(hook_id.to_string()))?;
        hooks.remove(position);
        Ok(())
    }

    fn hooks_for_event(&self, event: &str) -> usize {
        self.hooks.read().iter().filter(|h| h.event == event).count()
    }

    fn dispatch(&self, event: &str) -> usize {
        // Callbacks may register further hooks, so the lock is released first.
        let callbacks: Vec<HookCallback> = self
            .hooks
            .read()
            .iter()
            .filter(|h| h.event == event)
            .map(|h| Arc::clone(&h.callback))
            .collect();

        debug!(event, hooks = callbacks.len(), "Dispatching lifecycle event");
        for callback in &callbacks {
            callback();
        }
        callbacks.len()
    }
}
