//! No-op backend ("null")

use serde_json::Value;

use super::Backend;

/// Accepts every write and never returns anything
#[derive(Debug, Default, Clone, Copy)]
pub struct BlackHoleBackend;

impl BlackHoleBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for BlackHoleBackend {
    fn fetch(&self, _id: &str) -> Option<Value> {
        None
    }

    fn contains(&self, _id: &str) -> bool {
        false
    }

    fn save(&self, _id: &str, _payload: &Value, _ttl: u64) -> bool {
        true
    }

    // nothing is ever stored, so nothing is removed
    fn delete(&self, _id: &str) -> bool {
        false
    }

    fn flush(&self) -> bool {
        true
    }

    fn kind(&self) -> &'static str {
        "null"
    }
}
