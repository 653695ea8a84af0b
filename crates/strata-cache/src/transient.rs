//! Request-scoped cache for arbitrary values
//!
//! Unlike the backends, a [`TransientCache`] stores live Rust values, so it
//! can hold things that do not serialize (handles, closures, shared state).
//! Nothing outlives the request it is cleared at.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

type Slot = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct TransientCache {
    entries: RwLock<HashMap<String, Slot>>,
}

impl TransientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the value under `id`, or `None` if absent or of another type
    pub fn get<T: Clone + Send + Sync + 'static>(&self, id: &str) -> Option<T> {
        self.entries
            .read()
            .get(id)
            .and_then(|slot| slot.downcast_ref::<T>())
            .cloned()
    }

    /// Shared handle to the value under `id`
    pub fn get_shared<T: Send + Sync + 'static>(&self, id: &str) -> Option<Arc<T>> {
        let slot = self.entries.read().get(id).cloned()?;
        slot.downcast::<T>().ok()
    }

    pub fn has(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    pub fn set<T: Send + Sync + 'static>(&self, id: impl Into<String>, value: T) -> bool {
        self.entries.write().insert(id.into(), Arc::new(value));
        true
    }

    pub fn delete(&self, id: &str) -> bool {
        self.entries.write().remove(id).is_some()
    }

    pub fn flush_all(&self) -> bool {
        self.entries.write().clear();
        true
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl std::fmt::Debug for TransientCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransientCache")
            .field("entries", &self.len())
            .finish()
    }
}
