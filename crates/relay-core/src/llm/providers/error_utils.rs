//! Upstream error mapping and sanitization
//!
//! Error bodies from providers can echo request headers or keys back, so
//! everything that ends up in a [`DispatchError`] message is redacted and
//! truncated first.

use crate::config::Provider;
use crate::error::DispatchError;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::Value;

const MAX_ERROR_TEXT_CHARS: usize = 1_024;
const REDACTED: &str = "[REDACTED]";

static BEARER_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bBearer\s+[A-Za-z0-9._\-+/=]{8,}").expect("valid bearer token regex")
});

static KEY_VALUE_SECRET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(api[_-]?key|access[_-]?token|token|secret|password|authorization|x-api-key|x-goog-api-key|key)\b\s*[:=]\s*["']?[^"',\s}&]+"#,
    )
    .expect("valid key/value secret regex")
});

static PROVIDER_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(sk-[A-Za-z0-9_\-]{12,}|AIza[0-9A-Za-z_\-]{20,})").expect("valid api key regex")
});

/// Redact secrets from provider error text and cap its length
pub fn sanitize_provider_error_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "<empty error response body>".to_string();
    }

    let text = match serde_json::from_str::<Value>(trimmed) {
        Ok(json) => extract_error_message(&json)
            .map(redact_inline_secrets)
            .unwrap_or_else(|| {
                let mut json = json;
                redact_json_value(&mut json);
                json.to_string()
            }),
        Err(_) => redact_inline_secrets(trimmed),
    };
    truncate_with_suffix(text)
}

/// `error.message`, `error` or `message`, whichever the provider used
fn extract_error_message(json: &Value) -> Option<&str> {
    json.pointer("/error/message")
        .or_else(|| json.get("error").filter(|e| e.is_string()))
        .or_else(|| json.get("message"))
        .and_then(Value::as_str)
}

fn redact_json_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *val = Value::String(REDACTED.to_string());
                } else {
                    redact_json_value(val);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_json_value),
        Value::String(s) => *s = redact_inline_secrets(s),
        _ => {}
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.to_ascii_lowercase().replace(['-', ' '], "_");
    ["api_key", "token", "secret", "password", "authorization", "cookie", "private_key"]
        .iter()
        .any(|marker| normalized.contains(marker))
}

fn redact_inline_secrets(input: &str) -> String {
    let step = BEARER_TOKEN_RE.replace_all(input, "Bearer [REDACTED]");
    let step = KEY_VALUE_SECRET_RE.replace_all(&step, "$1=[REDACTED]");
    PROVIDER_KEY_RE.replace_all(&step, REDACTED).into_owned()
}

fn truncate_with_suffix(input: String) -> String {
    let char_count = input.chars().count();
    if char_count <= MAX_ERROR_TEXT_CHARS {
        return input;
    }

    let truncated: String = input.chars().take(MAX_ERROR_TEXT_CHARS).collect();
    format!(
        "{}... [truncated {} chars]",
        truncated,
        char_count - MAX_ERROR_TEXT_CHARS
    )
}

/// `retry-after` header in milliseconds (delta-seconds form only)
pub fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    let seconds: f64 = value.parse().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then(|| (seconds * 1000.0) as u64)
}

/// Map a non-success HTTP status to the error taxonomy
pub fn error_for_status(
    provider: Provider,
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> DispatchError {
    let message = sanitize_provider_error_text(body);
    match status.as_u16() {
        401 | 403 => DispatchError::auth(provider.as_str(), message),
        429 => match retry_after_ms(headers) {
            Some(ms) => DispatchError::rate_limit_with_retry_after(provider.as_str(), message, ms),
            None => DispatchError::rate_limit(provider.as_str(), message),
        },
        code => DispatchError::provider(provider.as_str(), Some(code), message),
    }
}

/// Read the body of a failed response and map it
pub async fn handle_http_error(response: reqwest::Response, provider: Provider) -> DispatchError {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    error_for_status(provider, status, &headers, &body)
}

/// Map a transport failure, keeping the provider name in the message
pub fn handle_transport_error(err: reqwest::Error, provider: Provider) -> DispatchError {
    let message = redact_inline_secrets(&err.to_string());
    if err.is_timeout() {
        DispatchError::http(format!("{} request timed out: {}", provider, message))
    } else {
        DispatchError::http(format!("{} request failed: {}", provider, message))
    }
}
