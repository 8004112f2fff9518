//! Anthropic Messages API dialect

use super::dialect::{DEFAULT_MAX_TOKENS, ParsedCompletion, ProviderDialect, as_u32, parse_arguments};
use crate::config::{AdapterConfig, Provider};
use crate::error::{DispatchError, DispatchResult};
use crate::llm::messages::{CompletionRequest, FinishReason, Message, MessageRole, ToolCall};
use crate::llm::sse_decoder::SseEvent;
use crate::llm::streaming::StreamChunk;
use crate::types::TokenUsage;
use serde_json::{Value, json};

pub const DEFAULT_API_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicDialect;

/// Tool-use block being assembled from `input_json_delta` events
#[derive(Debug, Default)]
struct PendingToolUse {
    id: String,
    name: String,
    input_json: String,
}

#[derive(Debug, Default)]
pub struct AnthropicStreamState {
    input_tokens: u32,
    output_tokens: u32,
    stop_reason: Option<String>,
    tool_use: Option<PendingToolUse>,
}

fn to_anthropic_message(message: &Message) -> Value {
    match message.role {
        MessageRole::Tool => json!({
            "role": "user",
            "content": [{
                "type": "tool_result",
                "tool_use_id": message.tool_call_id.clone().unwrap_or_default(),
                "content": message.content,
            }],
        }),
        MessageRole::Assistant if !message.tool_calls.is_empty() => {
            let mut blocks = Vec::new();
            if !message.content.is_empty() {
                blocks.push(json!({"type": "text", "text": message.content}));
            }
            blocks.extend(message.tool_calls.iter().map(|call| {
                json!({
                    "type": "tool_use",
                    "id": call.id,
                    "name": call.name,
                    "input": call.arguments,
                })
            }));
            json!({"role": "assistant", "content": blocks})
        }
        role => json!({"role": role.to_string(), "content": message.content}),
    }
}

impl ProviderDialect for AnthropicDialect {
    type StreamState = AnthropicStreamState;

    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn completion_url(&self, base_url: &str, _model: &str, _stream: bool) -> String {
        format!("{}/v1/messages", base_url)
    }

    fn health_url(&self, base_url: &str, _model: &str) -> String {
        format!("{}/v1/models", base_url)
    }

    fn headers(&self, config: &AdapterConfig, api_key: Option<&str>) -> Vec<(&'static str, String)> {
        let mut headers = vec![(
            "anthropic-version",
            config
                .api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        )];
        if let Some(key) = api_key {
            headers.push(("x-api-key", key.to_string()));
        }
        headers
    }

    fn build_body(&self, model: &str, request: &CompletionRequest, stream: bool) -> Value {
        let messages: Vec<Value> = request.conversation().map(to_anthropic_message).collect();
        let mut body = json!({
            "model": model,
            "messages": messages,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        if let Some(system) = request.effective_system() {
            body["system"] = json!(system);
        }
        // the API rejects temperature and top_p together
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        } else if let Some(top_p) = request.top_p {
            body["top_p"] = json!(top_p);
        }
        if !request.stop_sequences.is_empty() {
            body["stop_sequences"] = json!(request.stop_sequences);
        }
        if !request.tools.is_empty() {
            body["tools"] = Value::Array(
                request
                    .tools
                    .iter()
                    .map(|t| {
                        json!({
                            "name": t.name,
                            "description": t.description,
                            "input_schema": t.input_schema,
                        })
                    })
                    .collect(),
            );
        }
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    fn parse_response(&self, body: Value) -> DispatchResult<ParsedCompletion> {
        let blocks = body["content"].as_array().ok_or_else(|| {
            DispatchError::json("anthropic response is missing the content array")
        })?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for block in blocks {
            match block["type"].as_str() {
                Some("text") => content.push_str(block["text"].as_str().unwrap_or_default()),
                Some("tool_use") => tool_calls.push(ToolCall {
                    id: block["id"].as_str().unwrap_or_default().to_string(),
                    name: block["name"].as_str().unwrap_or_default().to_string(),
                    arguments: block["input"].clone(),
                }),
                _ => {}
            }
        }

        let usage = body["usage"].as_object().map(|usage| {
            TokenUsage::new(
                usage.get("input_tokens").map(as_u32).unwrap_or(0),
                usage.get("output_tokens").map(as_u32).unwrap_or(0),
            )
        });

        Ok(ParsedCompletion {
            content,
            tool_calls,
            usage,
            finish_reason: body["stop_reason"]
                .as_str()
                .map(FinishReason::from_vendor)
                .unwrap_or(FinishReason::Stop),
            model: body["model"].as_str().map(String::from),
        })
    }

    fn parse_stream_event(
        &self,
        state: &mut AnthropicStreamState,
        event: &SseEvent,
    ) -> DispatchResult<Vec<StreamChunk>> {
        let data: Value = serde_json::from_str(&event.data)?;
        let kind = event
            .event_type
            .as_deref()
            .or_else(|| data["type"].as_str())
            .unwrap_or_default();

        let mut chunks = Vec::new();
        match kind {
            "message_start" => {
                state.input_tokens = as_u32(&data["message"]["usage"]["input_tokens"]);
            }
            "content_block_start" => {
                let block = &data["content_block"];
                if block["type"] == "tool_use" {
                    state.tool_use = Some(PendingToolUse {
                        id: block["id"].as_str().unwrap_or_default().to_string(),
                        name: block["name"].as_str().unwrap_or_default().to_string(),
                        input_json: String::new(),
                    });
                }
            }
            "content_block_delta" => {
                let delta = &data["delta"];
                match delta["type"].as_str() {
                    Some("text_delta") => {
                        if let Some(text) = delta["text"].as_str().filter(|t| !t.is_empty()) {
                            chunks.push(StreamChunk::content(text));
                        }
                    }
                    Some("input_json_delta") => {
                        if let (Some(tool), Some(partial)) =
                            (state.tool_use.as_mut(), delta["partial_json"].as_str())
                        {
                            tool.input_json.push_str(partial);
                        }
                    }
                    _ => {}
                }
            }
            "content_block_stop" => {
                if let Some(tool) = state.tool_use.take() {
                    chunks.push(StreamChunk::tool_call(ToolCall {
                        id: tool.id,
                        name: tool.name,
                        arguments: parse_arguments(&tool.input_json),
                    }));
                }
            }
            "message_delta" => {
                if let Some(reason) = data["delta"]["stop_reason"].as_str() {
                    state.stop_reason = Some(reason.to_string());
                }
                if let Some(output) = data["usage"]["output_tokens"].as_u64() {
                    state.output_tokens = output.min(u32::MAX as u64) as u32;
                }
            }
            "message_stop" => {
                chunks.push(StreamChunk::done(
                    Some(TokenUsage::new(state.input_tokens, state.output_tokens)),
                    state
                        .stop_reason
                        .as_deref()
                        .map(FinishReason::from_vendor)
                        .unwrap_or(FinishReason::Stop),
                ));
            }
            "error" => {
                let message = data["error"]["message"]
                    .as_str()
                    .unwrap_or("unknown stream error");
                chunks.push(StreamChunk::error(format!("anthropic: {}", message)));
            }
            // ping and future event types
            _ => {}
        }
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::messages::ToolDefinition;

    #[test]
    fn test_build_body_separates_system_and_tools() {
        let request = CompletionRequest::new(vec![
            Message::system("be terse"),
            Message::user("hi"),
            Message::tool("42", "toolu_1"),
        ])
        .with_temperature(0.2)
        .with_top_p(0.9)
        .with_tools(vec![ToolDefinition::new("calc", "math", json!({"type": "object"}))]);

        let body = AnthropicDialect.build_body("claude-haiku-4-5", &request, true);

        assert_eq!(body["system"], "be terse");
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["messages"][1]["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(body["max_tokens"], 4096);
        assert!(body.get("top_p").is_none());
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_parse_response() {
        let parsed = AnthropicDialect
            .parse_response(json!({
                "model": "claude-sonnet-4-5",
                "content": [
                    {"type": "text", "text": "Let me check."},
                    {"type": "tool_use", "id": "toolu_9", "name": "weather", "input": {"city": "Oslo"}}
                ],
                "stop_reason": "tool_use",
                "usage": {"input_tokens": 12, "output_tokens": 30}
            }))
            .unwrap();

        assert_eq!(parsed.content, "Let me check.");
        assert_eq!(parsed.tool_calls[0].arguments["city"], "Oslo");
        assert_eq!(parsed.finish_reason, FinishReason::ToolUse);
        assert_eq!(parsed.usage.unwrap().total_tokens, 42);
    }

    #[test]
    fn test_stream_events() {
        let dialect = AnthropicDialect;
        let mut state = AnthropicStreamState::default();
        let events = [
            SseEvent::with_type("message_start", r#"{"message":{"usage":{"input_tokens":7}}}"#),
            SseEvent::with_type("content_block_delta", r#"{"delta":{"type":"text_delta","text":"Hel"}}"#),
            SseEvent::with_type("ping", "{}"),
            SseEvent::with_type(
                "content_block_start",
                r#"{"content_block":{"type":"tool_use","id":"t1","name":"lookup"}}"#,
            ),
            SseEvent::with_type(
                "content_block_delta",
                r#"{"delta":{"type":"input_json_delta","partial_json":"{\"q\":"}}"#,
            ),
            SseEvent::with_type(
                "content_block_delta",
                r#"{"delta":{"type":"input_json_delta","partial_json":"\"x\"}"}}"#,
            ),
            SseEvent::with_type("content_block_stop", "{}"),
            SseEvent::with_type(
                "message_delta",
                r#"{"delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":3}}"#,
            ),
            SseEvent::with_type("message_stop", "{}"),
        ];

        let chunks: Vec<StreamChunk> = events
            .iter()
            .flat_map(|e| dialect.parse_stream_event(&mut state, e).unwrap())
            .collect();

        assert_eq!(chunks[0], StreamChunk::content("Hel"));
        match &chunks[1] {
            StreamChunk::ToolCall { call } => assert_eq!(call.arguments["q"], "x"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            chunks[2],
            StreamChunk::done(Some(TokenUsage::new(7, 3)), FinishReason::Stop)
        );
    }

    #[test]
    fn test_stream_error_event() {
        let mut state = AnthropicStreamState::default();
        let chunks = AnthropicDialect
            .parse_stream_event(
                &mut state,
                &SseEvent::with_type("error", r#"{"error":{"type":"overloaded_error","message":"Overloaded"}}"#),
            )
            .unwrap();
        assert_eq!(chunks, vec![StreamChunk::error("anthropic: Overloaded")]);
    }
}
