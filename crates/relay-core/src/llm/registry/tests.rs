//! Adapter registry tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::AdapterRegistry;
use crate::config::{AdapterConfig, AdapterConfigPatch, Provider, RegistryConfig};
use crate::error::DispatchError;
use crate::llm::adapter::{CompletionAdapter, MockAdapterFactory};
use crate::llm::messages::CompletionRequest;
use crate::llm::test_support::FakeAdapter;
use crate::recovery::{CircuitBreakerConfig, TokioClock};

fn config(id: &str) -> AdapterConfig {
    AdapterConfig::new(id, Provider::OpenAi, format!("{}-model", id))
}

fn registry_config(ids: &[&str]) -> RegistryConfig {
    RegistryConfig::new(ids.iter().map(|id| config(id)).collect())
}

/// Factory that echoes the config's model and counts builds
fn counting_factory(builds: Arc<AtomicUsize>) -> MockAdapterFactory {
    let mut factory = MockAdapterFactory::new();
    factory.expect_build().returning(move |config| {
        builds.fetch_add(1, Ordering::SeqCst);
        let adapter: Arc<dyn CompletionAdapter> =
            FakeAdapter::ok(&config.id, &config.model).build();
        Ok(adapter)
    });
    factory
}

fn registry(ids: &[&str]) -> (AdapterRegistry, Arc<AtomicUsize>) {
    let builds = Arc::new(AtomicUsize::new(0));
    let registry = AdapterRegistry::new(Arc::new(counting_factory(builds.clone())));
    registry.initialize(registry_config(ids)).unwrap();
    (registry, builds)
}

#[test]
fn test_get_builds_once_and_caches() {
    let (registry, builds) = registry(&["a", "b"]);
    assert!(registry.cached_ids().is_empty());

    let first = registry.get("a").unwrap();
    let second = registry.get("a").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(registry.cached_ids(), vec!["a".to_string()]);
}

#[test]
fn test_get_unknown_id_does_not_build() {
    let mut factory = MockAdapterFactory::new();
    factory.expect_build().times(0);
    let registry = AdapterRegistry::new(Arc::new(factory));
    registry.initialize(registry_config(&["a"])).unwrap();

    let err = registry.get("missing").err().unwrap();
    assert!(matches!(err, DispatchError::AdapterNotFound { id } if id == "missing"));
}

#[test]
fn test_factory_error_is_returned_and_not_cached() {
    let mut factory = MockAdapterFactory::new();
    factory
        .expect_build()
        .times(2)
        .returning(|_| Err(DispatchError::config("no credential")));
    let registry = AdapterRegistry::new(Arc::new(factory));
    registry.initialize(registry_config(&["a"])).unwrap();

    assert!(registry.get("a").is_err());
    assert!(registry.get("a").is_err());
    assert!(registry.cached_ids().is_empty());
}

#[test]
fn test_initialize_rejects_bad_configs() {
    let (registry, _) = registry(&["a"]);

    let duplicate = registry_config(&["x", "x"]);
    assert!(matches!(
        registry.initialize(duplicate),
        Err(DispatchError::Config { .. })
    ));

    let unknown_default = registry_config(&["x"]).with_default("y");
    assert!(registry.initialize(unknown_default).is_err());

    assert_eq!(registry.ids(), vec!["a".to_string()]);
}

#[test]
fn test_initialize_drops_cache() {
    let (registry, builds) = registry(&["a"]);
    let before = registry.get("a").unwrap();

    registry.initialize(registry_config(&["a"])).unwrap();
    let after = registry.get("a").unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[test]
fn test_get_default() {
    let (registry, _) = registry(&["a", "b"]);
    assert_eq!(registry.get_default().unwrap().id(), "a");

    registry
        .initialize(registry_config(&["a", "b"]).with_default("b"))
        .unwrap();
    assert_eq!(registry.default_id().as_deref(), Some("b"));
    assert_eq!(registry.get_default().unwrap().id(), "b");

    registry.clear();
    assert!(registry.is_empty());
    assert!(matches!(
        registry.get_default().err().unwrap(),
        DispatchError::Config { .. }
    ));
}

#[test]
fn test_update_config_evicts_and_rebuilds() {
    let (registry, builds) = registry(&["a"]);
    let before = registry.get("a").unwrap();
    assert_eq!(before.model(), "fake-model");

    let patch = AdapterConfigPatch {
        model: Some("gpt-4o".to_string()),
        timeout_ms: Some(5_000),
        ..Default::default()
    };
    let updated = registry.update_config("a", &patch).unwrap();
    assert_eq!(updated.model, "gpt-4o");
    assert_eq!(updated.timeout_ms, 5_000);
    assert_eq!(updated.max_retries, 3);
    assert!(registry.cached_ids().is_empty());

    let after = registry.get("a").unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(builds.load(Ordering::SeqCst), 2);
    assert_eq!(registry.config("a").unwrap().model, "gpt-4o");
}

#[test]
fn test_update_config_passes_new_settings_to_factory() {
    let mut factory = MockAdapterFactory::new();
    factory
        .expect_build()
        .withf(|config| config.model == "a-model")
        .times(1)
        .returning(|config| Ok(FakeAdapter::ok(&config.id, "").build() as Arc<dyn CompletionAdapter>));
    factory
        .expect_build()
        .withf(|config| config.model == "claude-sonnet-4-5")
        .times(1)
        .returning(|config| Ok(FakeAdapter::ok(&config.id, "").build() as Arc<dyn CompletionAdapter>));

    let registry = AdapterRegistry::new(Arc::new(factory));
    registry.initialize(registry_config(&["a"])).unwrap();
    registry.get("a").unwrap();

    let patch = AdapterConfigPatch {
        provider: Some(Provider::Anthropic),
        model: Some("claude-sonnet-4-5".to_string()),
        ..Default::default()
    };
    registry.update_config("a", &patch).unwrap();
    registry.get("a").unwrap();
}

#[test]
fn test_invalid_update_keeps_previous_config() {
    let (registry, builds) = registry(&["a"]);
    registry.get("a").unwrap();

    let patch = AdapterConfigPatch {
        timeout_ms: Some(0),
        ..Default::default()
    };
    assert!(registry.update_config("a", &patch).is_err());
    assert_eq!(registry.config("a").unwrap().timeout_ms, 60_000);
    assert_eq!(registry.cached_ids(), vec!["a".to_string()]);
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    assert!(matches!(
        registry.update_config("zzz", &AdapterConfigPatch::default()),
        Err(DispatchError::AdapterNotFound { .. })
    ));
}

#[tokio::test]
async fn test_reload_probes_cached_adapters_then_reinitializes() {
    let mut factory = MockAdapterFactory::new();
    factory.expect_build().returning(|config| {
        let health = match config.id.as_str() {
            "up" => Ok(true),
            "down" => Ok(false),
            _ => Err(DispatchError::http("connection refused")),
        };
        Ok(FakeAdapter::ok(&config.id, "").health(health).build() as Arc<dyn CompletionAdapter>)
    });
    let registry = AdapterRegistry::new(Arc::new(factory));
    registry
        .initialize(registry_config(&["up", "down", "broken", "never-used"]))
        .unwrap();
    registry.get("up").unwrap();
    registry.get("down").unwrap();
    registry.get("broken").unwrap();

    let health = registry.reload(registry_config(&["fresh"])).await.unwrap();

    assert_eq!(health.len(), 3);
    assert_eq!(health["up"], true);
    assert_eq!(health["down"], false);
    assert_eq!(health["broken"], false);
    assert!(!health.contains_key("never-used"));
    assert_eq!(registry.ids(), vec!["fresh".to_string()]);
    assert!(registry.cached_ids().is_empty());
}

#[tokio::test]
async fn test_reload_with_invalid_config_keeps_old_one() {
    let (registry, _) = registry(&["a"]);
    assert!(registry.reload(registry_config(&["b", "b"])).await.is_err());
    assert_eq!(registry.ids(), vec!["a".to_string()]);
}

#[tokio::test]
async fn test_health_check_covers_every_config() {
    let mut factory = MockAdapterFactory::new();
    factory.expect_build().returning(|config| match config.id.as_str() {
        "unbuildable" => Err(DispatchError::config("missing credential")),
        "throws" => Ok(FakeAdapter::ok("throws", "")
            .health(Err(DispatchError::timeout("probe", 5)))
            .build() as Arc<dyn CompletionAdapter>),
        id => Ok(FakeAdapter::ok(id, "").build() as Arc<dyn CompletionAdapter>),
    });
    let registry = AdapterRegistry::new(Arc::new(factory));
    registry
        .initialize(registry_config(&["ok", "throws", "unbuildable"]))
        .unwrap();

    let health = registry.health_check().await;
    assert_eq!(health.len(), 3);
    assert!(health["ok"]);
    assert!(!health["throws"]);
    assert!(!health["unbuildable"]);
}

#[test]
fn test_concurrent_get_converges_on_one_adapter() {
    let (registry, builds) = registry(&["a"]);

    let adapters: Vec<Arc<dyn CompletionAdapter>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| registry.get("a").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let cached = registry.get("a").unwrap();
    assert!(adapters.iter().all(|a| Arc::ptr_eq(a, &cached)));
    assert!(builds.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_fallback_chain_uses_given_order() {
    let (registry, _) = registry(&["a", "b", "c"]);
    let order = vec!["c".to_string(), "a".to_string()];

    let chain = registry
        .fallback_chain(&order, CircuitBreakerConfig::default(), TokioClock::shared())
        .unwrap();
    assert_eq!(chain.adapter_ids(), vec!["c", "a"]);

    let response = chain
        .complete(&CompletionRequest::from_prompt("hi"))
        .await
        .unwrap();
    assert_eq!(response.content, "c-model");

    let missing = registry.fallback_chain(
        &["nope".to_string()],
        CircuitBreakerConfig::default(),
        TokioClock::shared(),
    );
    assert!(missing.is_err());
}
