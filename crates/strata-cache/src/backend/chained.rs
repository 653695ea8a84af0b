//! Tiered backend ("chained")
//!
//! Tiers are ordered fastest first. A hit in a slower tier is copied into every
//! faster tier with a bounded TTL, so a value that was promoted but later
//! changed in the slow tier goes stale for at most that long.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::Backend;

/// Lifetime in seconds of values copied into faster tiers
pub const DEFAULT_PROMOTION_TTL: u64 = 300;

/// Read-through chain of backends
pub struct ChainedBackend {
    tiers: Vec<Arc<dyn Backend>>,
    promotion_ttl: u64,
}

impl ChainedBackend {
    pub fn new(tiers: Vec<Arc<dyn Backend>>) -> Self {
        Self {
            tiers,
            promotion_ttl: DEFAULT_PROMOTION_TTL,
        }
    }

    pub fn with_promotion_ttl(mut self, ttl: u64) -> Self {
        self.promotion_ttl = ttl;
        self
    }

    pub fn tiers(&self) -> &[Arc<dyn Backend>] {
        &self.tiers
    }

    pub fn promotion_ttl(&self) -> u64 {
        self.promotion_ttl
    }
}

impl std::fmt::Debug for ChainedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainedBackend")
            .field(
                "tiers",
                &self.tiers.iter().map(|t| t.kind()).collect::<Vec<_>>(),
            )
            .field("promotion_ttl", &self.promotion_ttl)
            .finish()
    }
}

impl Backend for ChainedBackend {
    fn fetch(&self, id: &str) -> Option<Value> {
        for (index, tier) in self.tiers.iter().enumerate() {
            let Some(value) = tier.fetch(id) else {
                continue;
            };

            for faster in &self.tiers[..index] {
                if !faster.save(id, &value, self.promotion_ttl) {
                    debug!(id, tier = faster.kind(), "Promotion into faster tier failed");
                }
            }
            if index > 0 {
                debug!(id, from = tier.kind(), hit_tier = index, "Promoted cache entry");
            }
            return Some(value);
        }
        None
    }

    fn contains(&self, id: &str) -> bool {
        self.tiers.iter().any(|tier| tier.contains(id))
    }

    fn save(&self, id: &str, payload: &Value, ttl: u64) -> bool {
        self.tiers
            .iter()
            .fold(true, |ok, tier| tier.save(id, payload, ttl) && ok)
    }

    fn delete(&self, id: &str) -> bool {
        self.tiers
            .iter()
            .fold(false, |removed, tier| tier.delete(id) || removed)
    }

    fn flush(&self) -> bool {
        self.tiers.iter().fold(true, |ok, tier| tier.flush() && ok)
    }

    fn kind(&self) -> &'static str {
        "chained"
    }
}
