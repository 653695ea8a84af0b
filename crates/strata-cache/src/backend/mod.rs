//! Cache storage backends
//!
//! Every storage strategy implements [`Backend`]. Backends never return
//! errors: a storage failure is reported as `false` from a write and as a
//! miss from a read, and logged.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

mod black_hole;
mod chained;
mod file;
mod instrumented;
mod memory;

pub use black_hole::BlackHoleBackend;
pub use chained::{ChainedBackend, DEFAULT_PROMOTION_TTL};
pub use file::{FileBackend, FlushObserver, CACHE_FILE_EXTENSION};
pub use instrumented::{BackendStats, InstrumentedBackend};
pub use memory::InMemoryBackend;

/// Option table passed to backend constructors
pub type BackendOptions = serde_json::Map<String, Value>;

/// Storage strategy contract
///
/// `ttl` is in seconds; 0 means the entry never expires.
pub trait Backend: Send + Sync {
    /// Stored payload, or `None` if missing, expired or unreadable
    fn fetch(&self, id: &str) -> Option<Value>;

    /// True iff [`fetch`](Backend::fetch) would return a payload
    fn contains(&self, id: &str) -> bool;

    /// Store `payload` under `id`; false on storage failure
    fn save(&self, id: &str, payload: &Value, ttl: u64) -> bool;

    /// Remove `id`; true if something was removed
    fn delete(&self, id: &str) -> bool;

    /// Remove every entry stored through this backend
    fn flush(&self) -> bool;

    /// Short type name used in logs
    fn kind(&self) -> &'static str;
}

/// Expiry instant for an entry written now with `ttl` seconds
///
/// `None` for ttl 0 and for lifetimes too large to represent.
pub(crate) fn expiry_after(ttl: u64) -> Option<DateTime<Utc>> {
    if ttl == 0 {
        return None;
    }
    let seconds = i64::try_from(ttl).ok()?;
    let lifetime = Duration::try_seconds(seconds)?;
    Utc::now().checked_add_signed(lifetime)
}

pub(crate) fn is_expired(expires_at: Option<DateTime<Utc>>) -> bool {
    expires_at.map(|at| Utc::now() >= at).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ttl_never_expires() {
        assert_eq!(expiry_after(0), None);
        assert!(!is_expired(None));
    }

    #[test]
    fn test_huge_ttl_is_treated_as_unbounded() {
        assert_eq!(expiry_after(u64::MAX), None);
    }

    #[test]
    fn test_expiry_in_future() {
        let at = expiry_after(60).unwrap();
        assert!(at > Utc::now());
        assert!(!is_expired(Some(at)));
        assert!(is_expired(Some(Utc::now() - Duration::seconds(1))));
    }
}
