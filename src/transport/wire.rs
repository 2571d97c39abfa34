//! Server-push framing.
//!
//! Each event is written as
//!
//! ```text
//! event: <kind>
//! data: <json payload>
//!
//! ```
//!
//! `FrameDecoder` reads that format back from an arbitrary chunking of the
//! byte stream. It also accepts `\r\n` line endings and skips comment lines
//! (those starting with `:`).

use axum::response::sse::Event;

use crate::broker::StreamEvent;

/// Converts an event into axum's server-sent event.
pub fn to_sse_event(event: &StreamEvent) -> Result<Event, serde_json::Error> {
    Ok(Event::default()
        .event(event.kind())
        .data(event.payload_json()?))
}

/// Renders an event as a complete text frame, blank-line terminated.
pub fn encode_frame(event: &StreamEvent) -> Result<String, serde_json::Error> {
    Ok(format!(
        "event: {}\ndata: {}\n\n",
        event.kind(),
        event.payload_json()?
    ))
}

/// One decoded block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: Option<String>,
    pub data: String,
}

impl Frame {
    pub fn into_stream_event(self) -> Result<StreamEvent, serde_json::Error> {
        let kind = self.event.as_deref().unwrap_or("message");
        StreamEvent::from_wire(kind, &self.data)
    }
}

#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes and returns every frame completed by them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }

        frames
    }

    fn process_line(&mut self, line: &str) -> Option<Frame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // id and retry carry nothing this relay uses
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<Frame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(Frame { event, data })
    }
}
