//! End-to-end dispatch through the registry, HTTP adapters and a fallback chain

use futures::StreamExt;
use relay_core::config::{Credential, load_from_file};
use relay_core::llm::streaming::stream_utils::collect_stream;
use relay_core::{
    AdapterConfig, AdapterRegistry, CircuitBreakerConfig, CircuitState, CompletionRequest,
    DispatchError, FallbackChainBuilder, Provider, RegistryConfig, StreamChunk, TokioClock,
};
use serde_json::json;
use std::io::Write;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter(id: &str, provider: Provider, model: &str, server: &MockServer) -> AdapterConfig {
    AdapterConfig::new(id, provider, model)
        .with_credential(Credential::new("integration-key"))
        .with_base_url(server.uri())
        .with_max_retries(0)
        .with_timeout_ms(2_000)
}

async fn failing_anthropic(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "type": "error",
            "error": {"type": "api_error", "message": "Internal server error"}
        })))
        .mount(server)
        .await;
}

async fn healthy_openai(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-mini",
            "choices": [{"message": {"content": "Feature list ready"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_registry_chain_falls_back_across_providers() {
    let anthropic = MockServer::start().await;
    let openai = MockServer::start().await;
    failing_anthropic(&anthropic).await;
    healthy_openai(&openai).await;

    let registry = AdapterRegistry::with_http_factory().unwrap();
    registry
        .initialize(RegistryConfig::new(vec![
            adapter("primary", Provider::Anthropic, "claude-sonnet-4-5", &anthropic),
            adapter("backup", Provider::OpenAi, "gpt-4o-mini", &openai),
        ]))
        .unwrap();

    let chain = registry
        .fallback_chain(
            &registry.ids(),
            CircuitBreakerConfig::new(1, 60_000),
            TokioClock::shared(),
        )
        .unwrap();

    let request = CompletionRequest::from_prompt("Decompose: users can export reports");
    let response = chain.complete(&request).await.unwrap();
    assert_eq!(response.content, "Feature list ready");
    assert_eq!(response.provider, Provider::OpenAi);
    assert_eq!(response.usage.total_tokens, 16);

    assert_eq!(chain.breaker("primary").unwrap().state(), CircuitState::Open);
    assert_eq!(chain.provider(), Some(Provider::Anthropic));

    chain.complete(&request).await.unwrap();
    assert_eq!(anthropic.received_requests().await.unwrap().len(), 1);
    assert_eq!(openai.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_all_providers_failing_surfaces_last_error() {
    let anthropic = MockServer::start().await;
    let openai = MockServer::start().await;
    failing_anthropic(&anthropic).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided"}
        })))
        .mount(&openai)
        .await;

    let registry = AdapterRegistry::with_http_factory().unwrap();
    registry
        .initialize(RegistryConfig::new(vec![
            adapter("primary", Provider::Anthropic, "claude-sonnet-4-5", &anthropic),
            adapter("backup", Provider::OpenAi, "gpt-4o", &openai),
        ]))
        .unwrap();
    let chain = FallbackChainBuilder::new()
        .adapters(registry.adapters(&registry.ids()).unwrap())
        .build();

    let err = chain
        .complete(&CompletionRequest::from_prompt("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Auth { .. }), "{:?}", err);
    assert!(err.to_string().contains("Incorrect API key"));
}

#[tokio::test]
async fn test_streaming_falls_back_to_second_provider() {
    let anthropic = MockServer::start().await;
    let google = MockServer::start().await;
    failing_anthropic(&anthropic).await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:streamGenerateContent"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(concat!(
                    "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"1. Export \"}]}}]}\n\n",
                    "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"as CSV\"}]},\"finishReason\":\"STOP\"}],",
                    "\"usageMetadata\":{\"promptTokenCount\":6,\"candidatesTokenCount\":3}}\n\n",
                )),
        )
        .mount(&google)
        .await;

    let registry = AdapterRegistry::with_http_factory().unwrap();
    registry
        .initialize(RegistryConfig::new(vec![
            adapter("claude", Provider::Anthropic, "claude-sonnet-4-5", &anthropic),
            adapter("gemini", Provider::Google, "gemini-2.0-flash", &google),
        ]))
        .unwrap();
    let chain = FallbackChainBuilder::new()
        .adapters(registry.adapters(&registry.ids()).unwrap())
        .build();

    let request = CompletionRequest::from_prompt("Features for report export?");
    let chunks: Vec<StreamChunk> = chain.stream(&request).collect().await;

    assert_eq!(chunks.first(), Some(&StreamChunk::content("1. Export ")));
    assert!(matches!(chunks.last(), Some(StreamChunk::Done { .. })));
    assert!(!chunks.iter().any(|c| matches!(c, StreamChunk::Reset { .. })));

    let response = collect_stream(chain.stream(&request), Provider::Google, "gemini-2.0-flash")
        .await
        .unwrap();
    assert_eq!(response.content, "1. Export as CSV");
}

#[tokio::test]
async fn test_registry_from_config_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(
        file,
        r#"
default_adapter_id = "mini"

[[adapters]]
id = "mini"
provider = "openai"
model = "gpt-4o-mini"
credential = "literal-key"
base_url = "{uri}"
timeout_ms = 2000

[[adapters]]
id = "unreachable"
provider = "anthropic"
model = "claude-haiku-4-5"
base_url = "http://127.0.0.1:9"
timeout_ms = 1000
"#,
        uri = server.uri()
    )
    .unwrap();

    let config = load_from_file(file.path()).unwrap();
    config.validate().unwrap();

    let registry = AdapterRegistry::with_http_factory().unwrap();
    registry.initialize(config.registry_config()).unwrap();
    assert_eq!(registry.get_default().unwrap().id(), "mini");

    let health = registry.health_check().await;
    assert_eq!(health.get("mini"), Some(&true));
    assert_eq!(health.get("unreachable"), Some(&false));

    let before = registry.reload(config.registry_config()).await.unwrap();
    assert_eq!(before.len(), 2);
    assert!(registry.cached_ids().is_empty());
}
