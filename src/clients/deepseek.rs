mod models;

pub use models::DeepSeekModel;

use crate::config::KeyFromEnv;
use crate::core::{LowLevelClient, PromptRequest};
use crate::error::{AIError, DeepSeekError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";

#[derive(Debug, Serialize)]
struct DeepSeekRequest<'a> {
    model: &'a str,
    messages: Vec<DeepSeekMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct DeepSeekMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct DeepSeekResponse {
    choices: Vec<DeepSeekChoice>,
}

#[derive(Debug, Deserialize)]
struct DeepSeekChoice {
    message: DeepSeekResponseMessage,
}

#[derive(Debug, Deserialize)]
struct DeepSeekResponseMessage {
    #[serde(default)]
    content: String,
}

/// Configuration for DeepSeek client
#[derive(Debug, Clone)]
pub struct DeepSeekConfig {
    pub api_key: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for DeepSeekConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEEPSEEK_BASE_URL.to_string(),
            max_tokens: 4096,
            temperature: 0.3,
        }
    }
}

impl DeepSeekConfig {
    pub fn from_env() -> Option<Self> {
        let api_key = DeepSeekClient::find_key()?;
        Some(Self { api_key, ..Self::default() })
    }
}

/// DeepSeek chat backend. Batch only: sessions on this family go straight
/// to the single-shot path.
#[derive(Clone, Debug)]
pub struct DeepSeekClient {
    config: DeepSeekConfig,
    client: Client,
}

impl KeyFromEnv for DeepSeekClient {
    const KEY_NAME: &'static str = "DEEPSEEK_API_KEY";
}

impl DeepSeekClient {
    pub fn new(config: DeepSeekConfig) -> Self {
        info!(base_url = %config.base_url, "Creating new DeepSeek client");
        Self { config, client: Client::new() }
    }

    fn request<'a>(&self, prompt: &'a PromptRequest) -> DeepSeekRequest<'a> {
        DeepSeekRequest {
            model: &prompt.model,
            messages: vec![
                DeepSeekMessage { role: "system", content: &prompt.system },
                DeepSeekMessage { role: "user", content: &prompt.user },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: prompt.json_mode.then_some(ResponseFormat { kind: "json_object" }),
        }
    }
}

#[async_trait]
impl LowLevelClient for DeepSeekClient {
    #[instrument(target = "slide_quiz::provider", skip(self, prompt), fields(prompt_len = prompt.user.len(), model = %prompt.model))]
    async fn ask_raw(&self, prompt: &PromptRequest) -> Result<String, AIError> {
        debug!("Sending request to DeepSeek API");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(&self.config.api_key)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                DeepSeekError::Http(e.to_string())
            })?;

        debug!(status = %response.status(), "Received response from DeepSeek API");

        if response.status() == 429 {
            warn!("DeepSeek API rate limit exceeded");
            return Err(DeepSeekError::RateLimit.into());
        }

        if response.status() == 401 {
            error!("DeepSeek API authentication failed");
            return Err(DeepSeekError::Authentication.into());
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "DeepSeek API error");
            return Err(DeepSeekError::Api(error_text).into());
        }

        let deepseek_response: DeepSeekResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse DeepSeek response JSON");
            DeepSeekError::Http(e.to_string())
        })?;

        let content = deepseek_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                error!("No choices in DeepSeek response");
                DeepSeekError::Api("No choices in response".to_string())
            })?;

        info!(response_len = content.len(), "Received DeepSeek response");
        Ok(content)
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_mode_requests_json_object() {
        let client = DeepSeekClient::new(DeepSeekConfig::default());
        let prompt = PromptRequest::new("deepseek-chat", "sys", "u").json();
        let body = serde_json::to_value(client.request(&prompt)).unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][1]["content"], "u");

        let body = serde_json::to_value(client.request(&PromptRequest::new("deepseek-chat", "s", "u"))).unwrap();
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn batch_only() {
        let client = DeepSeekClient::new(DeepSeekConfig::default());
        assert!(client.stream_raw(&PromptRequest::new("deepseek-chat", "s", "u")).is_none());
    }
}
