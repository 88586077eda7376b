//! Decoding of provider server-sent-event responses into text deltas.

use async_stream::stream;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::io::StreamReader;
use tracing::{debug, trace};

use crate::core::{DeltaStream, RawByteStream};
use crate::error::AIError;

/// Event payload conventions of the streaming backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseDialect {
    /// `choices[0].delta.content`, terminated by `data: [DONE]`.
    OpenAIChat,
    /// `content_block_delta` events carrying `delta.text`, terminated by `message_stop`.
    AnthropicMessages,
}

/// What one SSE event means for the delta stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseOutcome {
    Delta(String),
    /// Nothing usable (keep-alives, role headers, empty content, bad JSON).
    Skip,
    Done,
    Failed(String),
}

/// Interpret one SSE event (its lines, without the blank terminator).
pub fn parse_sse_event(event: &str, dialect: SseDialect) -> SseOutcome {
    let mut data = String::new();
    for line in event.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }

    let payload = data.trim();
    if payload.is_empty() {
        return SseOutcome::Skip;
    }
    if payload == "[DONE]" {
        return SseOutcome::Done;
    }
    let Ok(v) = serde_json::from_str::<Value>(payload) else {
        return SseOutcome::Skip;
    };
    if let Some(err) = v.get("error").filter(|e| !e.is_null()) {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return SseOutcome::Failed(message);
    }

    let text = match dialect {
        SseDialect::OpenAIChat => v.pointer("/choices/0/delta/content").and_then(Value::as_str),
        SseDialect::AnthropicMessages => match v.get("type").and_then(Value::as_str) {
            Some("content_block_delta") => v.pointer("/delta/text").and_then(Value::as_str),
            Some("message_stop") => return SseOutcome::Done,
            _ => None,
        },
    };
    match text {
        Some(t) if !t.is_empty() => SseOutcome::Delta(t.to_string()),
        _ => SseOutcome::Skip,
    }
}

/// Turn an SSE byte stream into a stream of text deltas.
///
/// Events without a usable delta are skipped. Read failures and provider
/// error events end the stream with an `Err`.
pub fn sse_deltas(bytes: RawByteStream, dialect: SseDialect) -> DeltaStream {
    Box::pin(stream! {
        let io_stream = bytes.map(|res| res.map_err(|e| std::io::Error::other(e.to_string())));
        let mut lines = BufReader::new(StreamReader::new(io_stream)).lines();
        let mut event = String::new();

        loop {
            let (line, eof) = match lines.next_line().await {
                Ok(Some(line)) => (line, false),
                Ok(None) => (String::new(), true),
                Err(e) => {
                    debug!(target: "slide_quiz::sse", error = %e, "stream read failed");
                    yield Err(AIError::Stream(e.to_string()));
                    return;
                }
            };

            if !line.is_empty() {
                if !event.is_empty() {
                    event.push('\n');
                }
                event.push_str(&line);
                continue;
            }

            if !event.is_empty() {
                match parse_sse_event(&event, dialect) {
                    SseOutcome::Delta(text) => yield Ok(text),
                    SseOutcome::Skip => trace!(target: "slide_quiz::sse", "skipping event without delta"),
                    SseOutcome::Done => return,
                    SseOutcome::Failed(message) => {
                        yield Err(AIError::Stream(message));
                        return;
                    }
                }
                event.clear();
            }

            if eof {
                break;
            }
        }
    })
}
