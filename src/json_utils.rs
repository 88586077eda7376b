//! Incremental extraction of JSON candidates from model output.
//!
//! Deltas arrive with arbitrary split points (mid-token, mid-string,
//! mid-object). [`IncrementalExtractor`] keeps a rolling buffer and hands back
//! every candidate as soon as its closing delimiter is seen. Two buffering
//! strategies exist because providers emit two shapes of output:
//!
//! - [`ExtractMode::NewlineDelimited`]: one compact object per line (NDJSON).
//! - [`ExtractMode::BraceScan`]: objects concatenated with or without
//!   separators, possibly wrapped in code fences or prose.
//!
//! Parse failures are never errors here: an unparsable candidate is dropped
//! and never retried.

use async_stream::stream;
use futures_core::stream::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, trace};

use crate::core::DeltaStream;
use crate::error::AIError;

/// How deltas are cut into candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractMode {
    NewlineDelimited,
    BraceScan,
}

/// Type of a JSON node tracked by the scanner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeType {
    Object,
    Array,
}

/// Byte coordinates of a closed object within the whole stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjCoords {
    pub start: usize,
    /// Inclusive index of the closing brace.
    pub end: usize,
}

#[derive(Debug)]
struct Frame {
    start: usize,
    kind: NodeType,
    /// Top-level frame whose first significant byte has not been seen yet.
    fresh: bool,
}

impl Frame {
    fn outer(start: usize, kind: NodeType) -> Self {
        Self { start, kind, fresh: true }
    }

    fn inner(start: usize, kind: NodeType) -> Self {
        Self { start, kind, fresh: false }
    }
}

/// Whether `b` can be the first non-whitespace byte inside a structure of `kind`.
fn can_open(kind: NodeType, b: u8) -> bool {
    match kind {
        NodeType::Object => matches!(b, b'"' | b'}'),
        NodeType::Array => matches!(b, b'{' | b'[' | b']' | b'"' | b'-' | b'0'..=b'9' | b't' | b'f' | b'n'),
    }
}

/// Incremental tokenizer that reports objects as they close.
///
/// Tracks nesting depth and string/escape state, so braces inside strings and
/// nested objects (`choices` holding objects, `explanation` holding `{}`) do
/// not split a candidate. An object is reported when no enclosing object is
/// open: top-level objects and objects directly inside top-level arrays.
/// Text outside any structure is skipped, including stray quotes. A top-level
/// `{` or `[` whose next significant byte cannot start its contents is prose
/// (`in {question, answer form:`); its frame is dropped and scanning resumes
/// at that byte.
#[derive(Debug, Default)]
pub struct BraceScanner {
    stack: Vec<Frame>,
    in_string: bool,
    escape: bool,
    /// Absolute offset (bytes) of the start of the next chunk.
    offset: usize,
}

impl BraceScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns the objects closed within it.
    #[instrument(target = "slide_quiz::json_stream", level = "trace", skip(self, chunk), fields(chunk_len = chunk.len(), offset = self.offset))]
    pub fn feed(&mut self, chunk: &str) -> Vec<ObjCoords> {
        let mut closed = Vec::new();

        for (i, &b) in chunk.as_bytes().iter().enumerate() {
            let idx = self.offset + i;

            if let [outer] = self.stack.as_mut_slice() {
                if outer.fresh && !b.is_ascii_whitespace() {
                    if can_open(outer.kind, b) {
                        outer.fresh = false;
                    } else {
                        trace!(target: "slide_quiz::json_stream", start = outer.start, "stray opener in prose");
                        self.stack.clear();
                    }
                }
            }

            if self.stack.is_empty() {
                match b {
                    b'{' => self.stack.push(Frame::outer(idx, NodeType::Object)),
                    b'[' => self.stack.push(Frame::outer(idx, NodeType::Array)),
                    _ => {}
                }
                continue;
            }

            if self.in_string {
                if self.escape {
                    self.escape = false;
                    continue;
                }
                match b {
                    b'\\' => self.escape = true,
                    b'"' => self.in_string = false,
                    _ => {}
                }
                continue;
            }

            match b {
                b'"' => self.in_string = true,
                b'{' => self.stack.push(Frame::inner(idx, NodeType::Object)),
                b'[' => self.stack.push(Frame::inner(idx, NodeType::Array)),
                b'}' | b']' => {
                    // Mismatched closers still pop; the candidate then fails to parse.
                    if let Some(frame) = self.stack.pop() {
                        let inside_object = self.stack.iter().any(|f| f.kind == NodeType::Object);
                        if b == b'}' && frame.kind == NodeType::Object && !inside_object {
                            closed.push(ObjCoords { start: frame.start, end: idx });
                        }
                    }
                }
                _ => {}
            }
        }

        self.offset += chunk.len();
        closed
    }

    /// True when no structure is open.
    pub fn is_idle(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Find all top-level objects (and objects inside top-level arrays) in `text`.
pub fn find_json_objects(text: &str) -> Vec<ObjCoords> {
    BraceScanner::new().feed(text)
}

/// Rolling-buffer extractor over a sequence of text deltas.
#[derive(Debug)]
pub struct IncrementalExtractor {
    mode: ExtractMode,
    buffer: String,
    /// Absolute stream offset of `buffer[0]`.
    base: usize,
    scanner: BraceScanner,
}

impl IncrementalExtractor {
    pub fn new(mode: ExtractMode) -> Self {
        Self { mode, buffer: String::new(), base: 0, scanner: BraceScanner::new() }
    }

    /// Bytes currently held back waiting for more input.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Append a delta and return every candidate it completed, in order.
    pub fn push(&mut self, delta: &str) -> Vec<Value> {
        match self.mode {
            ExtractMode::NewlineDelimited => self.push_lines(delta),
            ExtractMode::BraceScan => self.push_braces(delta),
        }
    }

    fn push_lines(&mut self, delta: &str) -> Vec<Value> {
        self.buffer.push_str(delta);
        let mut out = Vec::new();
        while let Some(nl) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=nl).collect();
            if let Some(v) = parse_candidate(&line) {
                out.push(v);
            } else {
                trace!(target: "slide_quiz::json_stream", line_len = line.len(), "dropping unparsable line");
            }
        }
        out
    }

    fn push_braces(&mut self, delta: &str) -> Vec<Value> {
        self.buffer.push_str(delta);
        let mut out = Vec::new();
        let mut consumed_to = None;

        for node in self.scanner.feed(delta) {
            let start = node.start - self.base;
            let end = node.end + 1 - self.base;
            if let Some(v) = parse_candidate(&self.buffer[start..end]) {
                out.push(v);
            } else {
                trace!(target: "slide_quiz::json_stream", start = node.start, end = node.end, "dropping unparsable object");
            }
            consumed_to = Some(node.end + 1);
        }

        if self.scanner.is_idle() {
            self.buffer.clear();
            self.base = self.scanner.offset();
        } else if let Some(end) = consumed_to {
            self.buffer.drain(..end - self.base);
            self.base = end;
        }
        out
    }

    /// End-of-stream flush: the remaining buffer is one last candidate.
    /// Always called exactly once; a parse failure yields nothing.
    pub fn finish(mut self) -> Vec<Value> {
        let rest = std::mem::take(&mut self.buffer);
        match parse_candidate(&rest) {
            Some(v) => vec![v],
            None => {
                if !rest.trim().is_empty() {
                    trace!(target: "slide_quiz::json_stream", pending = rest.len(), "discarding unterminated tail");
                }
                Vec::new()
            }
        }
    }
}

/// Remove a surrounding Markdown code fence (with optional `json` tag).
pub fn strip_code_fence(text: &str) -> &str {
    let mut t = text.trim();
    if let Some(rest) = t.strip_prefix("```") {
        t = rest;
        if t.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
            t = &t[4..];
        }
    }
    if let Some(rest) = t.strip_suffix("```") {
        t = rest;
    }
    t.trim()
}

/// Trim, strip fences and parse. Empty or invalid text yields `None`.
pub fn parse_candidate(text: &str) -> Option<Value> {
    let t = strip_code_fence(text);
    if t.is_empty() {
        return None;
    }
    serde_json::from_str(t).ok()
}

/// Flatten wrappers: arrays yield their elements, `{"items": [...]}` yields
/// the items, anything else yields itself.
pub fn expand_candidate(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut obj) if obj.get("items").is_some_and(Value::is_array) => {
            match obj.remove("items") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            }
        }
        other => vec![other],
    }
}

/// Candidates from a complete (non-streamed) response.
///
/// Tries, in order: the whole text as one JSON document, NDJSON lines, and
/// finally a scan for objects embedded in prose.
#[instrument(target = "slide_quiz::json_stream", skip(text), fields(text_len = text.len()))]
pub fn parse_batch_response(text: &str) -> Vec<Value> {
    if let Some(doc) = parse_candidate(text) {
        return expand_candidate(doc);
    }

    let from_lines: Vec<Value> = text
        .lines()
        .filter_map(parse_candidate)
        .flat_map(expand_candidate)
        .collect();
    if !from_lines.is_empty() {
        return from_lines;
    }

    let scanned: Vec<Value> = find_json_objects(text)
        .into_iter()
        .filter_map(|c| parse_candidate(&text[c.start..=c.end]))
        .flat_map(expand_candidate)
        .collect();
    debug!(target: "slide_quiz::json_stream", candidates = scanned.len(), "scanned batch response for objects");
    scanned
}

/// Pump a delta stream through an extractor.
///
/// Yields candidates in completion order. A provider error is forwarded and
/// ends the stream without a flush; normal exhaustion flushes exactly once.
pub fn extract_candidates(mut deltas: DeltaStream, mode: ExtractMode) -> impl Stream<Item = Result<Value, AIError>> + Send {
    stream! {
        let mut extractor = IncrementalExtractor::new(mode);
        while let Some(delta) = deltas.next().await {
            match delta {
                Ok(text) => {
                    for candidate in extractor.push(&text) {
                        yield Ok(candidate);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
        for candidate in extractor.finish() {
            yield Ok(candidate);
        }
    }
}
