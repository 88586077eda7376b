use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::chunker::DEFAULT_MAX_CHARS;
use crate::clients::{ClaudeConfig, DeepSeekConfig, OpenAIConfig};

pub const DEFAULT_PORT: u16 = 5050;
pub const DEFAULT_MODEL: &str = "gpt-5-nano";
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Trait for types that can retrieve their configuration key from environment variables
pub trait KeyFromEnv {
    /// The environment variable name for this client's API key
    const KEY_NAME: &'static str;

    /// The API key from the environment (after `.env` is loaded), if non-empty.
    fn find_key() -> Option<String> {
        // First try to load .env file (silently fail if not found)
        let _ = dotenvy::dotenv();

        env::var(Self::KEY_NAME).ok().filter(|k| !k.trim().is_empty())
    }
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub default_model: String,
    pub chunk_max_chars: usize,
    pub provider_timeout: Duration,
    pub stream_idle_timeout: Duration,
    /// Output token cap passed to every backend that accepts one.
    pub max_output_tokens: Option<u32>,
    pub transcript_dir: Option<PathBuf>,
    pub openai: Option<OpenAIConfig>,
    pub claude: Option<ClaudeConfig>,
    pub deepseek: Option<DeepSeekConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            default_model: DEFAULT_MODEL.to_string(),
            chunk_max_chars: DEFAULT_MAX_CHARS,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            stream_idle_timeout: DEFAULT_STREAM_IDLE_TIMEOUT,
            max_output_tokens: None,
            transcript_dir: None,
            openai: None,
            claude: None,
            deepseek: None,
        }
    }
}

impl AppConfig {
    /// Load `.env` and read every setting, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        let max_output_tokens = env_parse::<u32>("QUIZ_MAX_OUTPUT_TOKENS");
        let mut config = Self {
            host: env_parse("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT").unwrap_or(defaults.port),
            default_model: env_string("QUIZ_DEFAULT_MODEL").unwrap_or(defaults.default_model),
            chunk_max_chars: env_parse("QUIZ_CHUNK_MAX_CHARS")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.chunk_max_chars),
            provider_timeout: env_parse("QUIZ_PROVIDER_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.provider_timeout),
            stream_idle_timeout: env_parse("QUIZ_STREAM_IDLE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.stream_idle_timeout),
            max_output_tokens,
            transcript_dir: env_string("QUIZ_TRANSCRIPT_DIR").map(PathBuf::from),
            openai: OpenAIConfig::from_env(),
            claude: ClaudeConfig::from_env(),
            deepseek: DeepSeekConfig::from_env(),
        };
        config.apply_max_output_tokens();
        config
    }

    /// Push `max_output_tokens` into the configured backends.
    pub fn apply_max_output_tokens(&mut self) {
        let Some(n) = self.max_output_tokens else {
            return;
        };
        if let Some(c) = self.openai.as_mut() {
            c.max_completion_tokens = Some(n);
        }
        if let Some(c) = self.claude.as_mut() {
            c.max_tokens = n;
        }
        if let Some(c) = self.deepseek.as_mut() {
            c.max_tokens = n;
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}
