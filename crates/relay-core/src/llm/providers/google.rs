//! Google Gemini `generateContent` dialect

use super::dialect::{ParsedCompletion, ProviderDialect, as_u32};
use crate::config::{AdapterConfig, Provider};
use crate::error::{DispatchError, DispatchResult};
use crate::llm::messages::{CompletionRequest, FinishReason, Message, MessageRole, ToolCall};
use crate::llm::sse_decoder::SseEvent;
use crate::llm::streaming::StreamChunk;
use crate::types::TokenUsage;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, Default)]
pub struct GoogleDialect;

#[derive(Debug, Default)]
pub struct GoogleStreamState {
    usage: Option<TokenUsage>,
    finish_reason: Option<String>,
    tool_calls: usize,
}

fn to_gemini_content(message: &Message) -> Value {
    match message.role {
        MessageRole::Tool => json!({
            "role": "user",
            "parts": [{
                "functionResponse": {
                    "name": message.tool_call_id.clone().unwrap_or_default(),
                    "response": {"content": message.content},
                }
            }],
        }),
        MessageRole::Assistant => {
            let mut parts = Vec::new();
            if !message.content.is_empty() {
                parts.push(json!({"text": message.content}));
            }
            parts.extend(message.tool_calls.iter().map(|call| {
                json!({"functionCall": {"name": call.name, "args": call.arguments}})
            }));
            json!({"role": "model", "parts": parts})
        }
        _ => json!({"role": "user", "parts": [{"text": message.content}]}),
    }
}

fn usage_from(metadata: &Value) -> Option<TokenUsage> {
    metadata.as_object().map(|m| {
        TokenUsage::new(
            m.get("promptTokenCount").map(as_u32).unwrap_or(0),
            m.get("candidatesTokenCount").map(as_u32).unwrap_or(0),
        )
    })
}

/// Text and function calls of the first candidate
fn candidate_parts(body: &Value, first_call_index: usize) -> (String, Vec<ToolCall>) {
    let mut text = String::new();
    let mut calls = Vec::new();
    if let Some(parts) = body["candidates"][0]["content"]["parts"].as_array() {
        for part in parts {
            if let Some(t) = part["text"].as_str() {
                text.push_str(t);
            } else if let Some(call) = part.get("functionCall") {
                calls.push(ToolCall {
                    id: format!("call_{}", first_call_index + calls.len()),
                    name: call["name"].as_str().unwrap_or_default().to_string(),
                    arguments: call
                        .get("args")
                        .cloned()
                        .unwrap_or_else(|| Value::Object(Map::new())),
                });
            }
        }
    }
    (text, calls)
}

impl ProviderDialect for GoogleDialect {
    type StreamState = GoogleStreamState;

    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn completion_url(&self, base_url: &str, model: &str, stream: bool) -> String {
        if stream {
            format!("{}/v1beta/models/{}:streamGenerateContent?alt=sse", base_url, model)
        } else {
            format!("{}/v1beta/models/{}:generateContent", base_url, model)
        }
    }

    fn health_url(&self, base_url: &str, model: &str) -> String {
        format!("{}/v1beta/models/{}", base_url, model)
    }

    fn headers(&self, _config: &AdapterConfig, api_key: Option<&str>) -> Vec<(&'static str, String)> {
        api_key
            .map(|key| vec![("x-goog-api-key", key.to_string())])
            .unwrap_or_default()
    }

    fn build_body(&self, _model: &str, request: &CompletionRequest, _stream: bool) -> Value {
        let contents: Vec<Value> = request.conversation().map(to_gemini_content).collect();
        let mut body = json!({"contents": contents});

        if let Some(system) = request.effective_system() {
            body["systemInstruction"] = json!({"parts": [{"text": system}]});
        }

        let mut generation = Map::new();
        if let Some(temperature) = request.temperature {
            generation.insert("temperature".into(), json!(temperature));
        }
        if let Some(top_p) = request.top_p {
            generation.insert("topP".into(), json!(top_p));
        }
        if let Some(max_tokens) = request.max_tokens {
            generation.insert("maxOutputTokens".into(), json!(max_tokens));
        }
        if !request.stop_sequences.is_empty() {
            generation.insert("stopSequences".into(), json!(request.stop_sequences));
        }
        if !generation.is_empty() {
            body["generationConfig"] = Value::Object(generation);
        }

        if !request.tools.is_empty() {
            let declarations: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.input_schema,
                    })
                })
                .collect();
            body["tools"] = json!([{"functionDeclarations": declarations}]);
        }
        body
    }

    fn parse_response(&self, body: Value) -> DispatchResult<ParsedCompletion> {
        if body["candidates"].get(0).is_none() {
            let reason = body["promptFeedback"]["blockReason"]
                .as_str()
                .unwrap_or("no candidates returned");
            return Err(DispatchError::provider(
                Provider::Google.as_str(),
                None,
                format!("gemini returned no candidates: {}", reason),
            ));
        }

        let (content, tool_calls) = candidate_parts(&body, 0);
        let finish_reason = if tool_calls.is_empty() {
            body["candidates"][0]["finishReason"]
                .as_str()
                .map(FinishReason::from_vendor)
                .unwrap_or(FinishReason::Stop)
        } else {
            FinishReason::ToolUse
        };

        Ok(ParsedCompletion {
            content,
            tool_calls,
            usage: usage_from(&body["usageMetadata"]),
            finish_reason,
            model: body["modelVersion"].as_str().map(String::from),
        })
    }

    fn parse_stream_event(
        &self,
        state: &mut GoogleStreamState,
        event: &SseEvent,
    ) -> DispatchResult<Vec<StreamChunk>> {
        let data: Value = serde_json::from_str(&event.data)?;
        if let Some(message) = data["error"]["message"].as_str() {
            return Ok(vec![StreamChunk::error(format!("google: {}", message))]);
        }

        let (text, calls) = candidate_parts(&data, state.tool_calls);
        state.tool_calls += calls.len();

        let mut chunks = Vec::new();
        if !text.is_empty() {
            chunks.push(StreamChunk::content(text));
        }
        chunks.extend(calls.into_iter().map(StreamChunk::tool_call));

        if let Some(usage) = usage_from(&data["usageMetadata"]) {
            state.usage = Some(usage);
        }
        if let Some(reason) = data["candidates"][0]["finishReason"].as_str() {
            state.finish_reason = Some(reason.to_string());
        }
        Ok(chunks)
    }

    /// Gemini has no end-of-stream event; a finish reason marks completion
    fn finish_stream(&self, state: &mut GoogleStreamState) -> Option<StreamChunk> {
        let reason = state.finish_reason.as_deref()?;
        let finish_reason = if state.tool_calls > 0 {
            FinishReason::ToolUse
        } else {
            FinishReason::from_vendor(reason)
        };
        Some(StreamChunk::done(state.usage, finish_reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let dialect = GoogleDialect;
        assert_eq!(
            dialect.completion_url("https://g.test", "gemini-2.0-flash", true),
            "https://g.test/v1beta/models/gemini-2.0-flash:streamGenerateContent?alt=sse"
        );
        assert_eq!(
            dialect.completion_url("https://g.test", "gemini-2.0-flash", false),
            "https://g.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_build_body_maps_roles_and_generation_config() {
        let request = CompletionRequest::new(vec![Message::user("q"), Message::assistant("a")])
            .with_system("sys")
            .with_max_tokens(10);
        let body = GoogleDialect.build_body("gemini-2.0-flash", &request, false);

        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 10);
    }

    #[test]
    fn test_parse_response() {
        let parsed = GoogleDialect
            .parse_response(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "Hello"}, {"text": " there"}], "role": "model"},
                    "finishReason": "MAX_TOKENS"
                }],
                "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2},
                "modelVersion": "gemini-2.0-flash-001"
            }))
            .unwrap();

        assert_eq!(parsed.content, "Hello there");
        assert_eq!(parsed.finish_reason, FinishReason::Length);
        assert_eq!(parsed.usage, Some(TokenUsage::new(4, 2)));
    }

    #[test]
    fn test_blocked_prompt_is_an_error() {
        let err = GoogleDialect
            .parse_response(json!({"promptFeedback": {"blockReason": "SAFETY"}}))
            .unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_stream_finishes_on_close_after_finish_reason() {
        let dialect = GoogleDialect;
        let mut state = GoogleStreamState::default();

        let chunks = dialect
            .parse_stream_event(
                &mut state,
                &SseEvent::new(r#"{"candidates":[{"content":{"parts":[{"text":"Hi"}]}}]}"#),
            )
            .unwrap();
        assert_eq!(chunks, vec![StreamChunk::content("Hi")]);
        assert!(dialect.finish_stream(&mut state).is_none());

        dialect
            .parse_stream_event(
                &mut state,
                &SseEvent::new(
                    r#"{"candidates":[{"content":{"parts":[{"text":"!"}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":1,"candidatesTokenCount":2}}"#,
                ),
            )
            .unwrap();
        assert_eq!(
            dialect.finish_stream(&mut state),
            Some(StreamChunk::done(Some(TokenUsage::new(1, 2)), FinishReason::Stop))
        );
    }
}
