use bytes::BytesMut;
use serde::Deserialize;
use serde_json::Value;

/// Events of interest in the vendor's `event:`/`data:` stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CozeEvent {
    /// Incremental answer text from `conversation.message.delta`.
    Delta { content: String },
    /// A `conversation.message.completed` payload.
    Completed,
    /// The `"[DONE]"` terminator.
    Done,
}

#[derive(Deserialize)]
struct MessagePayload {
    #[serde(rename = "type")]
    kind: Option<String>,
    content: Option<String>,
}

/// Incremental decoder for the Coze SSE format. Raw bytes go in, typed
/// events come out. Partial lines are buffered across chunk boundaries and
/// only whole lines are consumed, so multi-byte characters split across
/// chunks decode correctly. Unparseable data lines are counted and skipped;
/// they never end the stream.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: BytesMut,
    event_type: String,
    skipped: u64,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns the events it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<CozeEvent> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            let line = String::from_utf8_lossy(&line[..pos]);
            if let Some(event) = self.handle_line(line.trim()) {
                events.push(event);
            }
        }
        events
    }

    /// Number of data lines that did not parse and were dropped.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn handle_line(&mut self, line: &str) -> Option<CozeEvent> {
        if line.is_empty() {
            return None;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            self.event_type = rest.trim().to_string();
            return None;
        }
        let data = line.strip_prefix("data:")?;

        match serde_json::from_str::<Value>(data) {
            Ok(Value::String(s)) if s == "[DONE]" => Some(CozeEvent::Done),
            Ok(value) => match self.event_type.as_str() {
                "conversation.message.completed" => Some(CozeEvent::Completed),
                "conversation.message.delta" => {
                    let payload: MessagePayload = serde_json::from_value(value).ok()?;
                    if payload.kind.as_deref() != Some("answer") {
                        return None;
                    }
                    payload
                        .content
                        .filter(|c| !c.is_empty())
                        .map(|content| CozeEvent::Delta { content })
                }
                _ => None,
            },
            Err(_) => {
                self.skipped += 1;
                None
            }
        }
    }
}
