//! Single-shot dispatch tests

use std::sync::Arc;
use std::time::Duration;

use super::super::builder::FallbackChainBuilder;
use super::super::manager::FallbackChain;
use super::super::types::{FallbackConfig, FallbackReason};
use crate::error::DispatchError;
use crate::llm::messages::CompletionRequest;
use crate::llm::test_support::{CallLog, FakeAdapter, dyn_adapters};
use crate::recovery::{CircuitBreakerConfig, CircuitState, ManualClock};

fn request() -> CompletionRequest {
    CompletionRequest::from_prompt("Split this requirement into features")
}

#[tokio::test]
async fn test_first_success_wins_in_order() {
    let log = CallLog::default();
    let a = FakeAdapter::failing("a", "a is down").log(&log).build();
    let b = FakeAdapter::failing("b", "b is down").log(&log).build();
    let c = FakeAdapter::ok("c", "from c").log(&log).build();

    let chain = FallbackChain::new(FallbackConfig::new(dyn_adapters(&[&a, &b, &c])));
    let response = chain.complete(&request()).await.unwrap();

    assert_eq!(response.content, "from c");
    assert_eq!((a.completes(), b.completes(), c.completes()), (1, 1, 1));
    assert_eq!(
        *log.lock(),
        vec!["complete:a", "complete:b", "complete:c"]
    );
}

#[tokio::test]
async fn test_success_stops_the_chain() {
    let a = FakeAdapter::ok("a", "primary").build();
    let b = FakeAdapter::ok("b", "secondary").build();

    let chain = FallbackChain::new(FallbackConfig::new(dyn_adapters(&[&a, &b])));
    let response = chain.complete(&request()).await.unwrap();

    assert_eq!(response.content, "primary");
    assert_eq!(b.completes(), 0);
    assert!(chain.history().is_empty());
}

#[tokio::test]
async fn test_all_failing_returns_last_error() {
    let a = FakeAdapter::failing("a", "first failure").build();
    let b = FakeAdapter::failing("b", "second failure").build();

    let chain = FallbackChain::new(FallbackConfig::new(dyn_adapters(&[&a, &b])));
    let err = chain.complete(&request()).await.unwrap_err();

    assert!(err.to_string().contains("second failure"), "{}", err);
    assert!(!err.to_string().contains("first failure"));
}

#[tokio::test]
async fn test_empty_chain_fails_with_all_adapters_failed() {
    let chain = FallbackChainBuilder::new().build();
    let err = chain.complete(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::AllAdaptersFailed {
            attempted: 0,
            skipped: 0
        }
    ));
}

#[tokio::test]
async fn test_open_breaker_is_skipped() {
    let a = FakeAdapter::failing("a", "down").build();
    let b = FakeAdapter::ok("b", "from b").build();

    let chain = FallbackChainBuilder::new()
        .adapters(dyn_adapters(&[&a, &b]))
        .circuit_breaker(CircuitBreakerConfig::new(1, 30_000))
        .build();

    chain.complete(&request()).await.unwrap();
    assert_eq!(chain.breaker("a").unwrap().state(), CircuitState::Open);

    let response = chain.complete(&request()).await.unwrap();
    assert_eq!(response.content, "from b");
    assert_eq!(a.completes(), 1);
    assert_eq!(b.completes(), 2);
}

#[tokio::test]
async fn test_every_breaker_open_yields_all_adapters_failed() {
    let a = FakeAdapter::failing("a", "down").build();
    let chain = FallbackChainBuilder::new()
        .add(a.clone())
        .circuit_breaker(CircuitBreakerConfig::new(1, 30_000))
        .build();

    let first = chain.complete(&request()).await.unwrap_err();
    assert!(first.to_string().contains("down"));

    let second = chain.complete(&request()).await.unwrap_err();
    assert!(matches!(
        second,
        DispatchError::AllAdaptersFailed {
            attempted: 0,
            skipped: 1
        }
    ));
    assert_eq!(a.completes(), 1);
}

#[tokio::test]
async fn test_breaker_cooldown_scenario() {
    let clock = Arc::new(ManualClock::new());
    let flaky = FakeAdapter::failing("always-fails", "upstream 500").build();
    let steady = FakeAdapter::ok("always-succeeds", "steady answer").build();

    let chain = FallbackChainBuilder::new()
        .adapters(dyn_adapters(&[&flaky, &steady]))
        .circuit_breaker(CircuitBreakerConfig::new(1, 50))
        .clock(clock.clone())
        .build();

    let first = chain.complete(&request()).await.unwrap();
    assert_eq!(first.content, "steady answer");
    assert_eq!(chain.breaker("always-fails").unwrap().state(), CircuitState::Open);

    clock.advance(Duration::from_millis(20));
    let second = chain.complete(&request()).await.unwrap();
    assert_eq!(second.content, "steady answer");
    assert_eq!(chain.breaker("always-fails").unwrap().state(), CircuitState::Open);
    assert_eq!(flaky.completes(), 1);

    clock.advance(Duration::from_millis(30));
    assert_eq!(
        chain.breaker("always-fails").unwrap().state(),
        CircuitState::HalfOpen
    );
    chain.complete(&request()).await.unwrap();
    assert_eq!(flaky.completes(), 2);
    assert_eq!(chain.breaker("always-fails").unwrap().state(), CircuitState::Open);
}

#[tokio::test]
async fn test_recovered_adapter_closes_its_breaker() {
    let clock = Arc::new(ManualClock::new());
    let a = FakeAdapter::ok("a", "back").build();
    let b = FakeAdapter::ok("b", "backup").build();

    let chain = FallbackChainBuilder::new()
        .adapters(dyn_adapters(&[&a, &b]))
        .circuit_breaker(CircuitBreakerConfig::new(1, 50))
        .clock(clock.clone())
        .build();
    chain.breaker("a").unwrap().trip();

    assert_eq!(chain.complete(&request()).await.unwrap().content, "backup");

    clock.advance(Duration::from_millis(50));
    assert_eq!(chain.complete(&request()).await.unwrap().content, "back");
    assert_eq!(chain.breaker("a").unwrap().state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_history_records_fallbacks() {
    let a = FakeAdapter::failing_with("a", DispatchError::rate_limit("openai", "429")).build();
    let b = FakeAdapter::failing_with("b", DispatchError::timeout("b", 100)).build();
    let c = FakeAdapter::ok("c", "ok").build();

    let chain = FallbackChain::new(FallbackConfig::new(dyn_adapters(&[&a, &b, &c])));
    chain.complete(&request()).await.unwrap();

    let history = chain.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].from_adapter, "a");
    assert_eq!(history[0].to_adapter.as_deref(), Some("b"));
    assert_eq!(history[0].reason, FallbackReason::RateLimited);
    assert_eq!(history[1].from_adapter, "b");
    assert_eq!(history[1].to_adapter.as_deref(), Some("c"));
    assert_eq!(history[1].reason, FallbackReason::Timeout);

    chain.clear_history();
    assert!(chain.history().is_empty());
}

#[tokio::test]
async fn test_history_is_bounded() {
    let a = FakeAdapter::failing("a", "down").build();
    let b = FakeAdapter::ok("b", "ok").build();

    let chain = FallbackChainBuilder::new()
        .adapters(dyn_adapters(&[&a, &b]))
        .circuit_breaker(CircuitBreakerConfig::new(100, 30_000))
        .max_history(3)
        .build();

    for _ in 0..5 {
        chain.complete(&request()).await.unwrap();
    }
    assert_eq!(chain.history().len(), 3);
}

#[tokio::test]
async fn test_concurrent_requests_share_breakers() {
    let a = FakeAdapter::failing("a", "down").build();
    let b = FakeAdapter::ok("b", "ok").build();

    let chain = Arc::new(
        FallbackChainBuilder::new()
            .adapters(dyn_adapters(&[&a, &b]))
            .circuit_breaker(CircuitBreakerConfig::new(3, 30_000))
            .build(),
    );

    let mut handles = Vec::new();
    for _ in 0..10 {
        let chain = chain.clone();
        handles.push(tokio::spawn(async move {
            chain.complete(&request()).await.map(|r| r.content)
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "ok");
    }

    let stats = chain.breaker("a").unwrap().stats();
    assert_eq!(stats.state, CircuitState::Open);
    assert!(a.completes() >= 3);
    assert_eq!(b.completes(), 10);
}
