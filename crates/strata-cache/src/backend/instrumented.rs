//! Operation counters around any backend

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Backend;

/// Snapshot of backend operation counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStats {
    pub fetches: u64,
    pub hits: u64,
    pub misses: u64,
    pub saves: u64,
    pub failed_saves: u64,
    pub deletes: u64,
    pub flushes: u64,
}

impl BackendStats {
    /// Hit rate as a percentage (0.0 to 100.0)
    pub fn hit_rate(&self) -> f64 {
        if self.fetches == 0 {
            0.0
        } else {
            (self.hits as f64 / self.fetches as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    fetches: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    saves: AtomicU64,
    failed_saves: AtomicU64,
    deletes: AtomicU64,
    flushes: AtomicU64,
}

/// Wraps a backend and counts calls into it
pub struct InstrumentedBackend {
    inner: Arc<dyn Backend>,
    counters: Counters,
}

impl InstrumentedBackend {
    pub fn new(inner: Arc<dyn Backend>) -> Self {
        Self {
            inner,
            counters: Counters::default(),
        }
    }

    pub fn inner(&self) -> &Arc<dyn Backend> {
        &self.inner
    }

    pub fn stats(&self) -> BackendStats {
        let c = &self.counters;
        BackendStats {
            fetches: c.fetches.load(Ordering::Relaxed),
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            saves: c.saves.load(Ordering::Relaxed),
            failed_saves: c.failed_saves.load(Ordering::Relaxed),
            deletes: c.deletes.load(Ordering::Relaxed),
            flushes: c.flushes.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        let c = &self.counters;
        for counter in [
            &c.fetches,
            &c.hits,
            &c.misses,
            &c.saves,
            &c.failed_saves,
            &c.deletes,
            &c.flushes,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Backend for InstrumentedBackend {
    fn fetch(&self, id: &str) -> Option<Value> {
        self.counters.fetches.fetch_add(1, Ordering::Relaxed);
        let value = self.inner.fetch(id);
        if value.is_some() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    // not counted as a fetch
    fn contains(&self, id: &str) -> bool {
        self.inner.contains(id)
    }

    fn save(&self, id: &str, payload: &Value, ttl: u64) -> bool {
        self.counters.saves.fetch_add(1, Ordering::Relaxed);
        let saved = self.inner.save(id, payload, ttl);
        if !saved {
            self.counters.failed_saves.fetch_add(1, Ordering::Relaxed);
        }
        saved
    }

    fn delete(&self, id: &str) -> bool {
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        self.inner.delete(id)
    }

    fn flush(&self) -> bool {
        self.counters.flushes.fetch_add(1, Ordering::Relaxed);
        self.inner.flush()
    }

    fn kind(&self) -> &'static str {
        self.inner.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BlackHoleBackend, InMemoryBackend};
    use serde_json::json;

    #[test]
    fn test_counts_operations() {
        let backend = InstrumentedBackend::new(Arc::new(InMemoryBackend::new()));
        backend.save("a", &json!(1), 0);
        backend.fetch("a");
        backend.fetch("b");
        backend.delete("a");
        backend.flush();

        let stats = backend.stats();
        assert_eq!(stats.saves, 1);
        assert_eq!(stats.fetches, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.deletes, 1);
        assert_eq!(stats.flushes, 1);
        assert_eq!(stats.hit_rate(), 50.0);
        assert_eq!(backend.kind(), "array");

        backend.reset();
        assert_eq!(backend.stats(), BackendStats::default());
    }

    #[test]
    fn test_black_hole_never_hits() {
        let backend = InstrumentedBackend::new(Arc::new(BlackHoleBackend));
        backend.save("a", &json!(1), 0);
        backend.fetch("a");
        assert_eq!(backend.stats().hits, 0);
        assert_eq!(backend.stats().failed_saves, 0);
    }
}
