//! Reframing of Flowise's line-oriented stream into client SSE frames.

use crate::error::ChatError;
use axum::response::sse::Event;
use bytes::{Buf, BytesMut};
use serde_json::json;

const SENTINEL: &str = "[DONE]";

/// One frame of the client-facing stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Data(String),
    /// Terminal; nothing follows an error frame.
    Error(ChatError),
}

impl StreamEvent {
    pub fn payload(&self) -> String {
        match self {
            StreamEvent::Data(data) => data.clone(),
            StreamEvent::Error(err) => json!({ "error": err.to_string() }).to_string(),
        }
    }

    /// Wire form, identical to what axum's `Sse` writes for `into_sse`.
    pub fn to_frame(&self) -> String {
        format!("data: {}\n\n", self.payload())
    }

    pub fn into_sse(self) -> Event {
        Event::default().data(self.payload())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StreamEvent::Error(_))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum LineAction {
    Skip,
    Done,
    Forward(String),
}

/// Decides what a single upstream line turns into.
///
/// Only a bare `[DONE]` line ends the relay. `data: [DONE]` is ordinary data.
pub fn classify_line(line: &str) -> LineAction {
    if line.trim().is_empty() {
        return LineAction::Skip;
    }
    if line.trim() == SENTINEL {
        return LineAction::Done;
    }
    if !line.starts_with("data:") {
        return LineAction::Skip;
    }
    let rest = line
        .strip_prefix("data: ")
        .or_else(|| line.strip_prefix("data:"))
        .unwrap_or(line);
    LineAction::Forward(rest.trim().to_string())
}

/// Splits an incoming byte stream into lines without buffering past the
/// current partial line.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line with its `\n` or `\r\n` ending removed.
    pub fn next_line(&mut self) -> Option<Result<String, ChatError>> {
        let pos = self.buf.iter().position(|b| *b == b'\n')?;
        let mut line = self.buf.split_to(pos);
        self.buf.advance(1);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        Some(decode_line(&line))
    }

    /// Whatever is left once the upstream closed without a final newline.
    pub fn finish(&mut self) -> Option<Result<String, ChatError>> {
        if self.buf.is_empty() {
            return None;
        }
        let mut line = self.buf.split();
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        Some(decode_line(&line))
    }
}

fn decode_line(raw: &[u8]) -> Result<String, ChatError> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|err| ChatError::UpstreamParse(err.to_string()))
}
