//! Integration tests for backend types supplied from outside the crate

use std::sync::Arc;

use serde_json::{json, Map, Value};
use strata_cache::plugin::{list_discovered_plugins, BackendPlugin};
use strata_cache::{
    Backend, BackendFactory, BackendOptions, BackendProvider, Cache, CacheError, InMemoryBackend,
};

/// Stand-in for a network backend
struct RemoteBackend {
    store: InMemoryBackend,
}

impl Backend for RemoteBackend {
    fn fetch(&self, id: &str) -> Option<Value> {
        self.store.fetch(id)
    }

    fn contains(&self, id: &str) -> bool {
        self.store.contains(id)
    }

    fn save(&self, id: &str, data: &Value, ttl: u64) -> bool {
        self.store.save(id, data, ttl)
    }

    fn delete(&self, id: &str) -> bool {
        self.store.delete(id)
    }

    fn flush(&self) -> bool {
        self.store.flush()
    }

    fn kind(&self) -> &'static str {
        "test-remote"
    }
}

fn build_remote(options: &BackendOptions) -> strata_cache::Result<Option<Arc<dyn Backend>>> {
    if !matches!(options.get("endpoint"), Some(Value::String(_))) {
        return Err(CacheError::configuration(
            "test-remote",
            "missing option 'endpoint'",
        ));
    }
    Ok(Some(Arc::new(RemoteBackend {
        store: InMemoryBackend::new(),
    })))
}

fn decline(_options: &BackendOptions) -> strata_cache::Result<Option<Arc<dyn Backend>>> {
    Ok(None)
}

inventory::submit! {
    BackendPlugin::new("test-remote", build_remote)
}

inventory::submit! {
    BackendPlugin::with_priority("test-declined", decline, 1)
}

fn remote_options(endpoint: &str) -> BackendOptions {
    let mut options = Map::new();
    options.insert("endpoint".to_string(), json!(endpoint));
    options
}

#[test]
fn plugin_backend_is_discovered() {
    let types = list_discovered_plugins();
    assert!(types.contains(&"test-remote"));
    assert!(types.contains(&"test-declined"));
}

#[test]
fn plugin_backend_is_built_and_memoized() {
    let factory = BackendFactory::new().with_options("test-remote", remote_options("cache.internal:7000"));

    let first = factory.build("test-remote").unwrap();
    let second = factory.build("test-remote").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.kind(), "test-remote");
    assert_eq!(factory.instance_count(), 1);

    let cache = Cache::new(first);
    cache.set("k", &42).unwrap();
    assert_eq!(Cache::new(second).get::<i32>("k").unwrap(), Some(42));
}

#[test]
fn different_options_build_different_instances() {
    let factory = BackendFactory::new();
    let a = factory.build_with("test-remote", &remote_options("a:1")).unwrap();
    let b = factory.build_with("test-remote", &remote_options("b:1")).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(factory.instance_count(), 2);
}

#[test]
fn plugin_configuration_error_is_propagated() {
    let factory = BackendFactory::new();
    assert!(matches!(
        factory.build("test-remote"),
        Err(CacheError::Configuration { .. })
    ));
    assert_eq!(factory.instance_count(), 0);
}

#[test]
fn declining_plugin_leaves_type_unknown() {
    let factory = BackendFactory::new();
    assert!(matches!(
        factory.build("test-declined"),
        Err(CacheError::UnknownBackend { .. })
    ));
}

#[test]
fn registered_provider_takes_precedence_over_plugin() {
    let factory = BackendFactory::new();
    let provider: Arc<dyn BackendProvider> = Arc::new(
        |_: &str, _: &BackendOptions| -> strata_cache::Result<Option<Arc<dyn Backend>>> {
            Ok(Some(Arc::new(InMemoryBackend::new())))
        },
    );
    factory.register_provider("test-remote", provider);

    let backend = factory.build_with("test-remote", &remote_options("ignored")).unwrap();
    assert_eq!(backend.kind(), "array");
}

#[test]
fn declining_provider_falls_back_to_plugin() {
    let factory = BackendFactory::new();
    let provider: Arc<dyn BackendProvider> = Arc::new(
        |_: &str, _: &BackendOptions| -> strata_cache::Result<Option<Arc<dyn Backend>>> { Ok(None) },
    );
    factory.register_provider("test-remote", provider);

    let backend = factory.build_with("test-remote", &remote_options("fallback:1")).unwrap();
    assert_eq!(backend.kind(), "test-remote");
}

#[test]
fn plugin_backend_can_be_a_chain_tier() {
    let factory = BackendFactory::new()
        .with_options("test-remote", remote_options("tier:1"))
        .with_options("chained", {
            let mut options = Map::new();
            options.insert("backends".to_string(), json!(["array", "test-remote"]));
            options
        });

    let chain = factory.build("chained").unwrap();
    let remote = factory.build("test-remote").unwrap();
    remote.save("warm", &json!("remote"), 0);

    assert_eq!(chain.fetch("warm"), Some(json!("remote")));
    assert!(factory.build("array").unwrap().contains("warm"));
}
