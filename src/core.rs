//! Low-level model client abstraction shared by every backend.

use std::fmt::Debug;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;

use crate::error::AIError;
use crate::json_utils::ExtractMode;

/// Raw byte stream from a provider's HTTP response.
pub type RawByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, AIError>> + Send>>;

/// Incremental text deltas produced by a streaming model call.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, AIError>> + Send>>;

/// One model call: system instructions plus the user prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    /// Ask the backend for a JSON-only response where it supports that.
    pub json_mode: bool,
}

impl PromptRequest {
    pub fn new(model: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self { model: model.into(), system: system.into(), user: user.into(), json_mode: false }
    }

    #[must_use]
    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Low-level model client.
///
/// Implementors provide `ask_raw`, which executes a prompt and returns the
/// final model text. Streaming-capable backends also override `stream_raw`
/// and report how their deltas should be cut into candidates.
#[async_trait]
pub trait LowLevelClient: Send + Sync + Debug {
    /// Complete the prompt and return the whole response text.
    async fn ask_raw(&self, request: &PromptRequest) -> Result<String, AIError>;

    /// Clone this client into a boxed trait object
    fn clone_box(&self) -> Box<dyn LowLevelClient>;

    /// Text deltas of a streaming response. `None` when the backend has no
    /// readable stream. Transport failures surface as `Err` items.
    fn stream_raw(&self, _request: &PromptRequest) -> Option<DeltaStream> {
        None
    }

    fn extract_mode(&self) -> ExtractMode {
        ExtractMode::NewlineDelimited
    }
}

impl Clone for Box<dyn LowLevelClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[async_trait]
impl LowLevelClient for Box<dyn LowLevelClient> {
    async fn ask_raw(&self, request: &PromptRequest) -> Result<String, AIError> {
        self.as_ref().ask_raw(request).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        self.as_ref().clone_box()
    }

    fn stream_raw(&self, request: &PromptRequest) -> Option<DeltaStream> {
        self.as_ref().stream_raw(request)
    }

    fn extract_mode(&self) -> ExtractMode {
        self.as_ref().extract_mode()
    }
}
