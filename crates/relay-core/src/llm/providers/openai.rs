//! OpenAI Chat Completions dialect
//!
//! Also serves OpenAI-compatible endpoints (local servers, gateways) through
//! a `base_url` override.

use super::dialect::{ParsedCompletion, ProviderDialect, as_u32, parse_arguments};
use crate::config::{AdapterConfig, Provider};
use crate::error::{DispatchError, DispatchResult};
use crate::llm::messages::{CompletionRequest, FinishReason, Message, MessageRole, ToolCall};
use crate::llm::sse_decoder::SseEvent;
use crate::llm::streaming::StreamChunk;
use crate::types::TokenUsage;
use serde_json::{Value, json};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiDialect;

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

#[derive(Debug, Default)]
pub struct OpenAiStreamState {
    tool_calls: BTreeMap<u64, PartialToolCall>,
    finish_reason: Option<String>,
    usage: Option<TokenUsage>,
}

impl OpenAiStreamState {
    fn drain_tool_calls(&mut self) -> Vec<StreamChunk> {
        std::mem::take(&mut self.tool_calls)
            .into_values()
            .map(|call| {
                StreamChunk::tool_call(ToolCall {
                    id: call.id,
                    name: call.name,
                    arguments: parse_arguments(&call.arguments),
                })
            })
            .collect()
    }

    fn done(&mut self) -> Vec<StreamChunk> {
        let mut chunks = self.drain_tool_calls();
        chunks.push(StreamChunk::done(
            self.usage,
            self.finish_reason
                .as_deref()
                .map(FinishReason::from_vendor)
                .unwrap_or(FinishReason::Stop),
        ));
        chunks
    }
}

fn to_openai_message(message: &Message) -> Value {
    match message.role {
        MessageRole::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id.clone().unwrap_or_default(),
            "content": message.content,
        }),
        MessageRole::Assistant if !message.tool_calls.is_empty() => {
            let content = match message.content.as_str() {
                "" => Value::Null,
                text => json!(text),
            };
            let tool_calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {"name": call.name, "arguments": call.arguments.to_string()},
                    })
                })
                .collect();
            json!({"role": "assistant", "content": content, "tool_calls": tool_calls})
        }
        role => json!({"role": role.to_string(), "content": message.content}),
    }
}

fn usage_from(value: &Value) -> Option<TokenUsage> {
    value.as_object().map(|usage| {
        TokenUsage::new(
            usage.get("prompt_tokens").map(as_u32).unwrap_or(0),
            usage.get("completion_tokens").map(as_u32).unwrap_or(0),
        )
    })
}

impl ProviderDialect for OpenAiDialect {
    type StreamState = OpenAiStreamState;

    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn completion_url(&self, base_url: &str, _model: &str, _stream: bool) -> String {
        format!("{}/chat/completions", base_url)
    }

    fn health_url(&self, base_url: &str, _model: &str) -> String {
        format!("{}/models", base_url)
    }

    fn headers(&self, _config: &AdapterConfig, api_key: Option<&str>) -> Vec<(&'static str, String)> {
        api_key
            .map(|key| vec![("authorization", format!("Bearer {}", key))])
            .unwrap_or_default()
    }

    fn build_body(&self, model: &str, request: &CompletionRequest, stream: bool) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = request.effective_system() {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.extend(request.conversation().map(to_openai_message));

        let mut body = json!({"model": model, "messages": messages});
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(top_p) = request.top_p {
            body["top_p"] = json!(top_p);
        }
        if !request.stop_sequences.is_empty() {
            body["stop"] = json!(request.stop_sequences);
        }
        if !request.tools.is_empty() {
            body["tools"] = Value::Array(
                request
                    .tools
                    .iter()
                    .map(|t| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": t.name,
                                "description": t.description,
                                "parameters": t.input_schema,
                            },
                        })
                    })
                    .collect(),
            );
        }
        if stream {
            body["stream"] = json!(true);
            body["stream_options"] = json!({"include_usage": true});
        }
        body
    }

    fn parse_response(&self, body: Value) -> DispatchResult<ParsedCompletion> {
        let choice = body["choices"]
            .get(0)
            .ok_or_else(|| DispatchError::json("openai response has no choices"))?;
        let message = &choice["message"];

        let tool_calls = message["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .map(|call| ToolCall {
                        id: call["id"].as_str().unwrap_or_default().to_string(),
                        name: call["function"]["name"].as_str().unwrap_or_default().to_string(),
                        arguments: parse_arguments(
                            call["function"]["arguments"].as_str().unwrap_or_default(),
                        ),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ParsedCompletion {
            content: message["content"].as_str().unwrap_or_default().to_string(),
            tool_calls,
            usage: usage_from(&body["usage"]),
            finish_reason: choice["finish_reason"]
                .as_str()
                .map(FinishReason::from_vendor)
                .unwrap_or(FinishReason::Stop),
            model: body["model"].as_str().map(String::from),
        })
    }

    fn parse_stream_event(
        &self,
        state: &mut OpenAiStreamState,
        event: &SseEvent,
    ) -> DispatchResult<Vec<StreamChunk>> {
        if event.is_done() {
            return Ok(state.done());
        }

        let data: Value = serde_json::from_str(&event.data)?;
        if let Some(message) = data["error"]["message"].as_str() {
            return Ok(vec![StreamChunk::error(format!("openai: {}", message))]);
        }
        if let Some(usage) = usage_from(&data["usage"]) {
            state.usage = Some(usage);
        }

        let mut chunks = Vec::new();
        let Some(choice) = data["choices"].get(0) else {
            return Ok(chunks);
        };

        let delta = &choice["delta"];
        if let Some(text) = delta["content"].as_str().filter(|t| !t.is_empty()) {
            chunks.push(StreamChunk::content(text));
        }
        if let Some(calls) = delta["tool_calls"].as_array() {
            for call in calls {
                let index = call["index"].as_u64().unwrap_or(0);
                let partial = state.tool_calls.entry(index).or_default();
                if let Some(id) = call["id"].as_str() {
                    partial.id = id.to_string();
                }
                if let Some(name) = call["function"]["name"].as_str() {
                    partial.name.push_str(name);
                }
                if let Some(arguments) = call["function"]["arguments"].as_str() {
                    partial.arguments.push_str(arguments);
                }
            }
        }
        if let Some(reason) = choice["finish_reason"].as_str() {
            state.finish_reason = Some(reason.to_string());
            chunks.extend(state.drain_tool_calls());
        }
        Ok(chunks)
    }

    fn finish_stream(&self, state: &mut OpenAiStreamState) -> Option<StreamChunk> {
        // some compatible servers close the connection without `[DONE]`
        state.finish_reason.is_some().then(|| {
            StreamChunk::done(
                state.usage,
                state
                    .finish_reason
                    .as_deref()
                    .map(FinishReason::from_vendor)
                    .unwrap_or(FinishReason::Stop),
            )
        })
    }
}
