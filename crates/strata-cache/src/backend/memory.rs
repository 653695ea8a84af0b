//! In-memory backend ("array")

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;

use super::{expiry_after, is_expired, Backend};

#[derive(Debug, Clone)]
struct MemoryEntry {
    payload: Value,
    expires_at: Option<DateTime<Utc>>,
}

/// Process-local map with lazy expiry
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet observed
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Live entry for `id`, dropping it if it has expired
    fn live(&self, id: &str) -> Option<Value> {
        {
            let entries = self.entries.read();
            match entries.get(id) {
                None => return None,
                Some(entry) if !is_expired(entry.expires_at) => {
                    return Some(entry.payload.clone())
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write();
        // re-check under the write lock, a concurrent save may have refreshed it
        if entries
            .get(id)
            .map(|entry| is_expired(entry.expires_at))
            .unwrap_or(false)
        {
            entries.remove(id);
            trace!(id, "Dropped expired in-memory entry");
        }
        None
    }
}

impl Backend for InMemoryBackend {
    fn fetch(&self, id: &str) -> Option<Value> {
        self.live(id)
    }

    fn contains(&self, id: &str) -> bool {
        self.live(id).is_some()
    }

    fn save(&self, id: &str, payload: &Value, ttl: u64) -> bool {
        self.entries.write().insert(
            id.to_string(),
            MemoryEntry {
                payload: payload.clone(),
                expires_at: expiry_after(ttl),
            },
        );
        true
    }

    fn delete(&self, id: &str) -> bool {
        self.entries.write().remove(id).is_some()
    }

    fn flush(&self) -> bool {
        self.entries.write().clear();
        true
    }

    fn kind(&self) -> &'static str {
        "array"
    }
}
