mod models;

pub use models::ClaudeModel;

use crate::config::KeyFromEnv;
use crate::core::{DeltaStream, LowLevelClient, PromptRequest};
use crate::error::{AIError, ClaudeError};
use crate::json_utils::ExtractMode;
use crate::sse::{sse_deltas, SseDialect};
use async_stream::stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    pub base_url: String,
    pub max_tokens: u32,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: ClaudeClient::find_key().unwrap_or_default(),
            base_url: ANTHROPIC_BASE_URL.to_string(),
            max_tokens: 4096,
        }
    }
}

impl ClaudeConfig {
    /// Configuration from `ANTHROPIC_API_KEY`; `None` without a key.
    pub fn from_env() -> Option<Self> {
        let api_key = ClaudeClient::find_key()?;
        Some(Self { api_key, ..Self::default() })
    }
}

#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ClaudeMessage<'a>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic Messages backend. Its deltas carry no reliable line breaks, so
/// candidates are cut by brace scanning.
#[derive(Clone, Debug)]
pub struct ClaudeClient {
    config: ClaudeConfig,
    client: reqwest::Client,
}

impl KeyFromEnv for ClaudeClient {
    const KEY_NAME: &'static str = "ANTHROPIC_API_KEY";
}

impl ClaudeClient {
    pub fn new(config: ClaudeConfig) -> Self {
        info!(base_url = %config.base_url, "Creating new Claude client");
        Self { config, client: reqwest::Client::new() }
    }

    fn request<'a>(&self, request: &'a PromptRequest, stream: bool) -> ClaudeRequest<'a> {
        ClaudeRequest {
            model: &request.model,
            max_tokens: self.config.max_tokens,
            system: &request.system,
            messages: vec![ClaudeMessage { role: "user", content: &request.user }],
            stream,
        }
    }

    fn post(&self) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/messages", self.config.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ClaudeError> {
    if resp.status() == 429 {
        warn!("Anthropic API rate limit exceeded");
        return Err(ClaudeError::RateLimit);
    }
    if resp.status() == 401 {
        error!("Anthropic API authentication failed");
        return Err(ClaudeError::Authentication);
    }
    if !resp.status().is_success() {
        let status = resp.status();
        let error_text = resp.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        error!(status = %status, error = %error_text, "Anthropic API error");
        return Err(ClaudeError::Api(error_text));
    }
    Ok(resp)
}

#[async_trait]
impl LowLevelClient for ClaudeClient {
    #[instrument(target = "slide_quiz::provider", skip(self, request), fields(model = %request.model, prompt_len = request.user.len()))]
    async fn ask_raw(&self, request: &PromptRequest) -> Result<String, AIError> {
        debug!("Sending request to Anthropic API");
        let response = self
            .post()
            .json(&self.request(request, false))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                ClaudeError::Http(e.to_string())
            })?;
        let response = check_status(response).await?;

        let claude_response: ClaudeResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Anthropic response JSON");
            ClaudeError::Http(e.to_string())
        })?;

        let text: String = claude_response.content.into_iter().filter_map(|c| c.text).collect();
        if text.is_empty() {
            return Err(ClaudeError::Api("No content in response".to_string()).into());
        }
        info!(response_len = text.len(), "Received Anthropic response");
        Ok(text)
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }

    fn stream_raw(&self, request: &PromptRequest) -> Option<DeltaStream> {
        let req = self.post().json(&self.request(request, true));
        let bytes = stream! {
            let resp = match req.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err::<Bytes, AIError>(ClaudeError::Http(e.to_string()).into());
                    return;
                }
            };
            let resp = match check_status(resp).await {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            };
            let mut bs = resp.bytes_stream();
            while let Some(chunk) = bs.next().await {
                match chunk {
                    Ok(b) => yield Ok(b),
                    Err(e) => {
                        yield Err(ClaudeError::Http(e.to_string()).into());
                        return;
                    }
                }
            }
        };
        Some(sse_deltas(Box::pin(bytes), SseDialect::AnthropicMessages))
    }

    fn extract_mode(&self) -> ExtractMode {
        ExtractMode::BraceScan
    }
}
