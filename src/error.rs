use std::time::Duration;

use thiserror::Error;

use crate::provider::ProviderFamily;

/// Failures a generation session can surface to its caller.
///
/// Malformed model output never shows up here: candidates that fail
/// validation are dropped where they are found.
#[derive(Error, Debug)]
pub enum QuizError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0} provider is not configured (missing {1})")]
    ProviderUnavailable(ProviderFamily, &'static str),
    #[error("Provider error: {0}")]
    Provider(#[from] AIError),
}

#[derive(Error, Debug)]
pub enum AIError {
    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Claude API error: {0}")]
    Claude(#[from] ClaudeError),
    #[error("DeepSeek API error: {0}")]
    DeepSeek(#[from] DeepSeekError),
    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
    #[error("stream error: {0}")]
    Stream(String),
    #[error("provider does not expose a readable stream")]
    NoStream,
    #[error("mock provider failure: {0}")]
    Mock(String),
}

#[derive(Error, Debug)]
pub enum OpenAIError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug)]
pub enum ClaudeError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug)]
pub enum DeepSeekError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}
