//! Property tests for the namespaced cache facade

use std::fs;
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{json, Value};
use strata_cache::{Backend, Cache, CacheError, FileBackend, InMemoryBackend};
use tempfile::TempDir;

fn key_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9_.-]{0,40}"
}

fn payload_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[ -~]{0,32}".prop_map(Value::from),
        prop::collection::vec(any::<u32>(), 0..8).prop_map(|v| json!(v)),
        ("[a-z]{1,8}", any::<i32>()).prop_map(|(k, v)| json!({ k: v })),
    ]
}

proptest! {
    #[test]
    fn prop_memory_save_then_fetch(key in key_strategy(), payload in payload_strategy()) {
        let cache = Cache::new(Arc::new(InMemoryBackend::new()));
        prop_assert!(cache.save(&key, &payload).unwrap());
        prop_assert_eq!(cache.fetch(&key).unwrap(), Some(payload));
        prop_assert!(cache.has(&key).unwrap());
        prop_assert!(cache.delete(&key).unwrap());
        prop_assert!(!cache.has(&key).unwrap());
    }

    #[test]
    fn prop_file_save_then_fetch(key in key_strategy(), payload in payload_strategy()) {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(Arc::new(FileBackend::new(dir.path())));
        prop_assert!(cache.save(&key, &payload).unwrap());

        // a fresh backend over the same directory reads what was written
        let reopened = Cache::new(Arc::new(FileBackend::new(dir.path())));
        prop_assert_eq!(reopened.fetch(&key).unwrap(), Some(payload));
    }

    #[test]
    fn prop_namespaces_are_isolated(
        key in key_strategy(),
        first in "[a-z]{1,10}",
        second in "[A-Z]{1,10}",
    ) {
        let backend: Arc<dyn Backend> = Arc::new(InMemoryBackend::new());
        let a = Cache::new(Arc::clone(&backend)).with_namespace(&first).unwrap();
        let b = Cache::new(Arc::clone(&backend)).with_namespace(&second).unwrap();
        let default = Cache::new(backend);

        a.save(&key, &json!("a")).unwrap();
        prop_assert!(!b.has(&key).unwrap());
        prop_assert!(!default.has(&key).unwrap());

        b.save(&key, &json!("b")).unwrap();
        prop_assert_eq!(a.fetch(&key).unwrap(), Some(json!("a")));
        prop_assert_eq!(b.fetch(&key).unwrap(), Some(json!("b")));
    }

    #[test]
    fn prop_keys_with_path_characters_are_rejected(
        prefix in "[a-z]{0,5}",
        bad in prop::sample::select(vec!['/', '\\', ' ', '~', ':', '*', '\0', '\n']),
        suffix in "[a-z]{0,5}",
    ) {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(Arc::new(FileBackend::new(dir.path().join("store"))));
        let key = format!("{prefix}{bad}{suffix}");

        let is_invalid_key = |r: Result<bool, CacheError>| matches!(r, Err(CacheError::InvalidKey { .. }));
        prop_assert!(is_invalid_key(cache.save(&key, &json!(1))));
        prop_assert!(is_invalid_key(cache.has(&key)));
        prop_assert!(is_invalid_key(cache.delete(&key)));
        prop_assert!(!dir.path().join("store").exists());
    }
}

#[test]
fn traversal_and_empty_keys_touch_nothing() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store");
    fs::create_dir(&store).unwrap();
    fs::write(dir.path().join("secret"), b"keep").unwrap();
    let cache = Cache::new(Arc::new(FileBackend::new(&store)));

    for key in ["", "../secret", "../etc/passwd", ".hidden", "-dash", "a/b"] {
        assert!(
            matches!(cache.save(key, &json!(1)), Err(CacheError::InvalidKey { .. })),
            "key {key:?} should be rejected"
        );
        assert!(cache.delete(key).is_err());
        assert!(cache.get::<i32>(key).is_err());
    }

    assert_eq!(fs::read_dir(&store).unwrap().count(), 0);
    assert_eq!(fs::read(dir.path().join("secret")).unwrap(), b"keep");
}

#[test]
fn version_partitions_entries() {
    let backend: Arc<dyn Backend> = Arc::new(InMemoryBackend::new());
    let old = Cache::new(Arc::clone(&backend)).with_version("1.0.0").unwrap();
    let new = Cache::new(backend).with_version("1.1.0").unwrap();

    old.set("config", &json!({"a": 1})).unwrap();
    assert_eq!(new.get::<Value>("config").unwrap(), None);
    assert_eq!(old.get::<Value>("config").unwrap(), Some(json!({"a": 1})));
}

#[test]
fn ttl_zero_never_expires_and_default_ttl_applies() {
    let cache = Cache::new(Arc::new(InMemoryBackend::new())).with_default_ttl(3600);
    assert_eq!(cache.default_ttl(), 3600);
    cache.set("long", &"lived").unwrap();
    cache.set_with_ttl("forever", &"value", 0).unwrap();
    assert_eq!(cache.get::<String>("long").unwrap().as_deref(), Some("lived"));
    assert_eq!(cache.get::<String>("forever").unwrap().as_deref(), Some("value"));
}
