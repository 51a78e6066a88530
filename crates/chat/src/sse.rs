//! Server-sent-event frame decoding for upstream chat streams.
//!
//! Upstreams send line-delimited frames. Only `data:` lines carry payloads;
//! blank lines, `:` comments and other fields (`event:`, `id:`) are skipped.
//! A malformed JSON payload is dropped rather than ending the stream.

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use serde_json::Value;
use std::pin::Pin;
use tokio::io::{AsyncBufReadExt, Lines};
use tokio_util::io::StreamReader;

/// End-of-stream sentinel used by OpenAI-compatible APIs.
pub const DONE_SENTINEL: &str = "[DONE]";

/// What one line of an event stream means to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    Skip,
    Data(&'a str),
    Done,
}

pub fn classify_line(line: &str) -> SseLine<'_> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }
    match line.strip_prefix("data:") {
        Some(payload) => {
            let payload = payload.trim();
            if payload == DONE_SENTINEL {
                SseLine::Done
            } else {
                SseLine::Data(payload)
            }
        }
        None => SseLine::Skip,
    }
}

/// Decoded meaning of one JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Incremental text to forward.
    Text(String),
    /// Provider said the message is complete.
    Stop,
    /// Provider reported an error inside the stream.
    Error(String),
    /// Valid frame with nothing to forward (role headers, usage, pings).
    Ignore,
}

/// OpenAI-compatible chunk: forward `choices[0].delta.content`.
///
/// Returns `None` for payloads that are not valid JSON.
pub fn openai_frame(payload: &str) -> Option<Frame> {
    let value: Value = serde_json::from_str(payload).ok()?;
    if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
        return Some(Frame::Error(error_message(err)));
    }
    let content = value
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some(if content.is_empty() {
        Frame::Ignore
    } else {
        Frame::Text(content.to_string())
    })
}

/// Anthropic Messages stream event, dispatched on its `type` field.
///
/// Returns `None` for payloads that are not valid JSON.
pub fn anthropic_frame(payload: &str) -> Option<Frame> {
    let value: Value = serde_json::from_str(payload).ok()?;
    let frame = match value.get("type").and_then(Value::as_str) {
        Some("content_block_delta") => value
            .pointer("/delta/text")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(|t| Frame::Text(t.to_string()))
            .unwrap_or(Frame::Ignore),
        Some("message_stop") => Frame::Stop,
        Some("error") => Frame::Error(
            value
                .get("error")
                .map(error_message)
                .unwrap_or_else(|| "unknown error".to_string()),
        ),
        _ => Frame::Ignore,
    };
    Some(frame)
}

fn error_message(err: &Value) -> String {
    match err {
        Value::String(s) => s.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Response body adapted to `AsyncBufRead` and split into lines.
pub(crate) type BodyLines = Lines<StreamReader<ByteStream, Bytes>>;

pub(crate) fn body_lines(response: reqwest::Response) -> BodyLines {
    let body: ByteStream = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
    StreamReader::new(body).lines()
}
