mod models;

pub use models::OpenAIModel;

use crate::config::KeyFromEnv;
use crate::core::{DeltaStream, LowLevelClient, PromptRequest};
use crate::error::{AIError, OpenAIError};
use crate::json_utils::ExtractMode;
use crate::sse::{sse_deltas, SseDialect};
use async_stream::stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub max_completion_tokens: Option<u32>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: OpenAIClient::find_key().unwrap_or_default(),
            base_url: OPENAI_BASE_URL.to_string(),
            max_completion_tokens: None,
        }
    }
}

impl OpenAIConfig {
    /// Configuration from `OPENAI_API_KEY` / `OPENAI_BASE_URL`; `None` without a key.
    pub fn from_env() -> Option<Self> {
        let api_key = OpenAIClient::find_key()?;
        let base_url = std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string());
        Some(Self { api_key, base_url, max_completion_tokens: None })
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI Chat Completions backend. Streams NDJSON deltas.
#[derive(Clone, Debug)]
pub struct OpenAIClient {
    config: OpenAIConfig,
    http: reqwest::Client,
}

impl KeyFromEnv for OpenAIClient {
    const KEY_NAME: &'static str = "OPENAI_API_KEY";
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> Self {
        info!(base_url = %config.base_url, "Creating new OpenAI client");
        Self { config, http: reqwest::Client::new() }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn messages_body(&self, request: &PromptRequest, stream: bool) -> serde_json::Value {
        let mut body = json!({
            "model": request.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user}
            ]
        });
        if stream {
            body["stream"] = json!(true);
        }
        if request.json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }
        if let Some(n) = self.config.max_completion_tokens {
            body["max_completion_tokens"] = json!(n);
        }
        body
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, OpenAIError> {
    if resp.status() == 401 {
        error!("OpenAI API authentication failed");
        return Err(OpenAIError::Authentication);
    }
    if resp.status() == 429 {
        warn!("OpenAI API rate limit exceeded");
        return Err(OpenAIError::RateLimit);
    }
    if !resp.status().is_success() {
        let status = resp.status();
        let txt = resp.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        error!(status = %status, error = %txt, "OpenAI API error");
        return Err(OpenAIError::Api(txt));
    }
    Ok(resp)
}

#[async_trait]
impl LowLevelClient for OpenAIClient {
    #[instrument(target = "slide_quiz::provider", skip(self, request), fields(model = %request.model, prompt_len = request.user.len()))]
    async fn ask_raw(&self, request: &PromptRequest) -> Result<String, AIError> {
        let body = self.messages_body(request, false);
        debug!("Sending request to OpenAI API");
        let resp = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                OpenAIError::Http(e.to_string())
            })?;
        let resp = check_status(resp).await?;

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| OpenAIError::Http(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OpenAIError::Api("No choices".into()))?;
        info!(response_len = content.len(), "Received OpenAI response");
        Ok(content)
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }

    fn stream_raw(&self, request: &PromptRequest) -> Option<DeltaStream> {
        let req = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .header("accept", "text/event-stream")
            .json(&self.messages_body(request, true));

        let bytes = stream! {
            let resp = match req.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err::<Bytes, AIError>(OpenAIError::Http(e.to_string()).into());
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
            let mut body = resp.bytes_stream();
            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(b) => yield Ok(b),
                    Err(e) => {
                        yield Err(OpenAIError::Http(e.to_string()).into());
                        return;
                    }
                }
            }
        };
        Some(sse_deltas(Box::pin(bytes), SseDialect::OpenAIChat))
    }

    fn extract_mode(&self) -> ExtractMode {
        ExtractMode::NewlineDelimited
    }
}
