use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;

use crate::core::{DeltaStream, LowLevelClient, PromptRequest};
use crate::error::AIError;
use crate::json_utils::ExtractMode;

/// One scripted step of a mock stream.
#[derive(Debug, Clone)]
pub enum MockDelta {
    Text(String),
    /// Sleep before the next step.
    Pause(Duration),
    /// End the stream with a provider error.
    Fail(String),
}

impl MockDelta {
    pub fn text(t: impl Into<String>) -> Self {
        Self::Text(t.into())
    }
}

#[derive(Debug, Clone)]
enum MockBatch {
    Text(String),
    Fail(String),
}

/// Observations shared between a [`MockClient`] and its clones.
#[derive(Debug, Default)]
pub struct MockHandle {
    stream_calls: AtomicUsize,
    batch_calls: AtomicUsize,
    streams_released: AtomicUsize,
    requests: Mutex<Vec<PromptRequest>>,
}

impl MockHandle {
    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    /// Streams that were dropped, whether exhausted or abandoned.
    pub fn streams_released(&self) -> usize {
        self.streams_released.load(Ordering::SeqCst)
    }

    /// Every prompt seen, stream and batch, in call order.
    pub fn requests(&self) -> Vec<PromptRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn record(&self, request: &PromptRequest) {
        if let Ok(mut r) = self.requests.lock() {
            r.push(request.clone());
        }
    }
}

struct ReleaseGuard(Arc<MockHandle>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.streams_released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Scripted client for tests and offline runs.
///
/// Without a scripted stream it behaves like a batch-only backend. Without a
/// scripted batch response every `ask_raw` fails.
#[derive(Debug, Clone)]
pub struct MockClient {
    stream: Option<Vec<MockDelta>>,
    batch: MockBatch,
    mode: ExtractMode,
    handle: Arc<MockHandle>,
}

impl MockClient {
    pub fn new() -> (Self, Arc<MockHandle>) {
        let handle = Arc::new(MockHandle::default());
        let client = Self {
            stream: None,
            batch: MockBatch::Fail("no batch response scripted".into()),
            mode: ExtractMode::NewlineDelimited,
            handle: handle.clone(),
        };
        (client, handle)
    }

    #[must_use]
    pub fn with_stream(mut self, deltas: Vec<MockDelta>) -> Self {
        self.stream = Some(deltas);
        self
    }

    /// Stream the given text pieces in order.
    #[must_use]
    pub fn with_text_stream<I, S>(self, pieces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_stream(pieces.into_iter().map(|p| MockDelta::Text(p.into())).collect())
    }

    #[must_use]
    pub fn with_batch_response(mut self, text: impl Into<String>) -> Self {
        self.batch = MockBatch::Text(text.into());
        self
    }

    #[must_use]
    pub fn with_batch_failure(mut self, message: impl Into<String>) -> Self {
        self.batch = MockBatch::Fail(message.into());
        self
    }

    #[must_use]
    pub fn with_extract_mode(mut self, mode: ExtractMode) -> Self {
        self.mode = mode;
        self
    }
}

#[async_trait]
impl LowLevelClient for MockClient {
    async fn ask_raw(&self, request: &PromptRequest) -> Result<String, AIError> {
        self.handle.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.handle.record(request);
        match &self.batch {
            MockBatch::Text(t) => Ok(t.clone()),
            MockBatch::Fail(m) => Err(AIError::Mock(m.clone())),
        }
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }

    fn stream_raw(&self, request: &PromptRequest) -> Option<DeltaStream> {
        let script = self.stream.clone()?;
        self.handle.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.handle.record(request);

        let guard = ReleaseGuard(self.handle.clone());
        Some(Box::pin(stream! {
            let _guard = guard;
            for step in script {
                match step {
                    MockDelta::Text(t) => yield Ok(t),
                    MockDelta::Pause(d) => tokio::time::sleep(d).await,
                    MockDelta::Fail(m) => {
                        yield Err(AIError::Mock(m));
                        return;
                    }
                }
            }
        }))
    }

    fn extract_mode(&self) -> ExtractMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn scripted_stream_and_release() {
        let (client, handle) = MockClient::new();
        let client = client.with_stream(vec![MockDelta::text("a"), MockDelta::Fail("boom".into())]);
        let req = PromptRequest::new("m", "s", "u");
        let items: Vec<_> = client.stream_raw(&req).unwrap().collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[1], Err(AIError::Mock(m)) if m == "boom"));
        assert_eq!(handle.stream_calls(), 1);
        assert_eq!(handle.streams_released(), 1);
        assert_eq!(handle.requests().len(), 1);
    }

    #[tokio::test]
    async fn batch_only_by_default() {
        let (client, handle) = MockClient::new();
        let req = PromptRequest::new("m", "s", "u");
        assert!(client.stream_raw(&req).is_none());
        assert!(client.ask_raw(&req).await.is_err());
        assert_eq!(handle.batch_calls(), 1);
        assert_eq!(handle.stream_calls(), 0);
    }
}
