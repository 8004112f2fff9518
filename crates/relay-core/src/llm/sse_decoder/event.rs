//! SSE event types

/// One dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if present
    pub event_type: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
}

impl SseEvent {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            event_type: None,
            data: data.into(),
        }
    }

    pub fn with_type(event_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event_type: Some(event_type.into()),
            data: data.into(),
        }
    }

    /// OpenAI-style `[DONE]` terminator
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }

    /// Event type, or `message` when none was sent
    pub fn kind(&self) -> &str {
        self.event_type.as_deref().unwrap_or("message")
    }
}
