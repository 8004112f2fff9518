//! Incremental Server-Sent Events decoder
//!
//! Network chunks can split an event (or a multi-byte UTF-8 character)
//! anywhere. The decoder keeps raw bytes until a blank line completes an
//! event; since the delimiter is ASCII, a completed event never ends in the
//! middle of a character.

mod event;


pub use event::SseEvent;

/// Buffered SSE decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return every event they complete
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some((end, delimiter_len)) = find_boundary(&self.pending) {
            let block: Vec<u8> = self.pending.drain(..end + delimiter_len).collect();
            if let Some(event) = parse_block(&block[..end]) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event that was not followed by a blank line
    pub fn finish(&mut self) -> Option<SseEvent> {
        let block = std::mem::take(&mut self.pending);
        parse_block(&block)
    }

    /// Whether bytes are buffered that have not formed an event yet
    pub fn has_remaining(&self) -> bool {
        self.pending.iter().any(|b| !b.is_ascii_whitespace())
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Position and length of the first blank-line delimiter
fn find_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i < buf.len() {
        if buf[i] == b'\n' {
            match buf.get(i + 1) {
                Some(b'\n') => return Some((i, 2)),
                Some(b'\r') if buf.get(i + 2) == Some(&b'\n') => return Some((i, 3)),
                _ => {}
            }
        } else if buf[i] == b'\r' && buf.get(i + 1) == Some(&b'\n') {
            if buf.get(i + 2) == Some(&b'\r') && buf.get(i + 3) == Some(&b'\n') {
                return Some((i, 4));
            }
            if buf.get(i + 2) == Some(&b'\n') {
                return Some((i, 3));
            }
        }
        i += 1;
    }
    None
}

fn parse_block(block: &[u8]) -> Option<SseEvent> {
    let text = String::from_utf8_lossy(block);
    let mut event_type = None;
    let mut data: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event_type = Some(value.trim().to_string()),
            "data" => data.push(value),
            // id and retry are not used by any provider we talk to
            _ => {}
        }
    }

    if data.is_empty() {
        return None;
    }
    Some(SseEvent {
        event_type,
        data: data.join("\n"),
    })
}
