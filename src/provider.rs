//! Provider families, model allow-lists and the registry that turns a
//! requested model id into a ready client.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures_util::StreamExt;
use tracing::{debug, info, instrument, warn};

use crate::clients::{
    ClaudeClient, ClaudeModel, DeepSeekClient, DeepSeekModel, OpenAIClient, OpenAIModel,
};
use crate::config::{AppConfig, KeyFromEnv, DEFAULT_MODEL, DEFAULT_PROVIDER_TIMEOUT, DEFAULT_STREAM_IDLE_TIMEOUT};
use crate::core::{DeltaStream, LowLevelClient, PromptRequest};
use crate::error::{AIError, QuizError};
use crate::interceptors::{FileInterceptor, Interceptor};
use crate::json_utils::ExtractMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderFamily {
    OpenAI,
    Claude,
    DeepSeek,
}

impl ProviderFamily {
    /// Lookup order when the default model has to be replaced.
    pub const ALL: [Self; 3] = [Self::OpenAI, Self::Claude, Self::DeepSeek];

    /// Credential variable this family needs.
    pub fn key_name(self) -> &'static str {
        match self {
            Self::OpenAI => OpenAIClient::KEY_NAME,
            Self::Claude => ClaudeClient::KEY_NAME,
            Self::DeepSeek => DeepSeekClient::KEY_NAME,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAI => OpenAIModel::default().id(),
            Self::Claude => ClaudeModel::default().id(),
            Self::DeepSeek => DeepSeekModel::default().id(),
        }
    }

    /// Family whose allow-list contains `model`.
    pub fn for_model(model: &str) -> Option<Self> {
        if OpenAIModel::from_id(model).is_some() {
            Some(Self::OpenAI)
        } else if ClaudeModel::from_id(model).is_some() {
            Some(Self::Claude)
        } else if DeepSeekModel::from_id(model).is_some() {
            Some(Self::DeepSeek)
        } else {
            None
        }
    }
}

impl fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenAI => "OpenAI",
            Self::Claude => "Anthropic",
            Self::DeepSeek => "DeepSeek",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProviderSettings {
    /// Bound on one batch call.
    pub provider_timeout: Duration,
    /// Bound on each wait for the next streamed delta.
    pub stream_idle_timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            stream_idle_timeout: DEFAULT_STREAM_IDLE_TIMEOUT,
        }
    }
}

/// Model output from one provider call.
pub enum Generation {
    Deltas(DeltaStream),
    Text(String),
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deltas(_) => f.write_str("Generation::Deltas(..)"),
            Self::Text(t) => f.debug_tuple("Generation::Text").field(&t.len()).finish(),
        }
    }
}

/// One client per configured family, built at startup and read-only after.
#[derive(Debug)]
pub struct ProviderRegistry {
    clients: HashMap<ProviderFamily, Box<dyn LowLevelClient>>,
    default_model: String,
    settings: ProviderSettings,
    interceptor: Option<Arc<dyn Interceptor>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl ProviderRegistry {
    /// Empty registry. Add clients with [`with_client`](Self::with_client).
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            clients: HashMap::new(),
            default_model: default_model.into(),
            settings: ProviderSettings::default(),
            interceptor: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self::new(config.default_model.clone()).with_settings(ProviderSettings {
            provider_timeout: config.provider_timeout,
            stream_idle_timeout: config.stream_idle_timeout,
        });
        if let Some(c) = &config.openai {
            registry = registry.with_client(ProviderFamily::OpenAI, OpenAIClient::new(c.clone()));
        }
        if let Some(c) = &config.claude {
            registry = registry.with_client(ProviderFamily::Claude, ClaudeClient::new(c.clone()));
        }
        if let Some(c) = &config.deepseek {
            registry = registry.with_client(ProviderFamily::DeepSeek, DeepSeekClient::new(c.clone()));
        }
        if let Some(dir) = &config.transcript_dir {
            registry = registry.with_interceptor(Arc::new(FileInterceptor::new(dir.clone())));
        }
        info!(
            target: "slide_quiz::provider",
            configured = ?registry.configured(),
            default_model = %registry.default_model,
            "provider registry ready"
        );
        registry
    }

    #[must_use]
    pub fn with_client(mut self, family: ProviderFamily, client: impl LowLevelClient + 'static) -> Self {
        self.clients.insert(family, Box::new(client));
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ProviderSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    pub fn is_configured(&self, family: ProviderFamily) -> bool {
        self.clients.contains_key(&family)
    }

    pub fn configured(&self) -> Vec<ProviderFamily> {
        ProviderFamily::ALL.into_iter().filter(|f| self.is_configured(*f)).collect()
    }

    /// Validated model id for a request.
    ///
    /// Unknown ids become the default model. If the default's family has no
    /// client, the first configured family's default model is used instead.
    pub fn resolve_model(&self, requested: Option<&str>) -> Result<(ProviderFamily, String), QuizError> {
        if let Some(id) = requested.map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(family) = ProviderFamily::for_model(id) {
                return Ok((family, id.to_string()));
            }
            debug!(target: "slide_quiz::provider", requested = id, "unknown model id, using default");
        }

        if let Some(family) = ProviderFamily::for_model(&self.default_model) {
            if self.is_configured(family) {
                return Ok((family, self.default_model.clone()));
            }
        }

        match self.configured().first() {
            Some(family) => Ok((*family, family.default_model().to_string())),
            None => {
                let family = ProviderFamily::for_model(&self.default_model).unwrap_or(ProviderFamily::OpenAI);
                Err(QuizError::ProviderUnavailable(family, family.key_name()))
            }
        }
    }

    /// Client for the requested model, or `ProviderUnavailable`.
    pub fn resolve(&self, requested: Option<&str>) -> Result<ResolvedProvider, QuizError> {
        let (family, model) = self.resolve_model(requested)?;
        let client = self.clients.get(&family).ok_or_else(|| {
            warn!(target: "slide_quiz::provider", %family, %model, "provider family not configured");
            QuizError::ProviderUnavailable(family, family.key_name())
        })?;
        Ok(ResolvedProvider {
            model,
            client: client.clone(),
            settings: self.settings,
            interceptor: self.interceptor.clone(),
        })
    }
}

/// A configured client bound to one validated model id.
#[derive(Debug, Clone)]
pub struct ResolvedProvider {
    model: String,
    client: Box<dyn LowLevelClient>,
    settings: ProviderSettings,
    interceptor: Option<Arc<dyn Interceptor>>,
}

impl ResolvedProvider {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn extract_mode(&self) -> ExtractMode {
        self.client.extract_mode()
    }

    /// Streamed deltas, each wait bounded by the idle timeout.
    ///
    /// Fails with `NoStream` when the backend has no readable stream.
    pub fn open_stream(&self, system: &str, user: &str) -> Result<DeltaStream, QuizError> {
        let request = PromptRequest::new(&self.model, system, user);
        let mut deltas = self.client.stream_raw(&request).ok_or(AIError::NoStream)?;
        let idle = self.settings.stream_idle_timeout;
        debug!(target: "slide_quiz::provider", model = %self.model, ?idle, "opened delta stream");

        Ok(Box::pin(stream! {
            loop {
                match tokio::time::timeout(idle, deltas.next()).await {
                    Ok(Some(delta)) => yield delta,
                    Ok(None) => break,
                    Err(_) => {
                        yield Err(AIError::Timeout(idle));
                        break;
                    }
                }
            }
        }))
    }

    /// Single JSON-mode call returning the whole response text.
    #[instrument(target = "slide_quiz::provider", skip(self, system, user), fields(model = %self.model, prompt_len = user.len()))]
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, QuizError> {
        let request = PromptRequest::new(&self.model, system, user).json();
        let timeout = self.settings.provider_timeout;
        let text = tokio::time::timeout(timeout, self.client.ask_raw(&request))
            .await
            .map_err(|_| AIError::Timeout(timeout))??;

        if let Some(interceptor) = &self.interceptor {
            if let Err(e) = interceptor.save(&self.model, user, &text).await {
                warn!(target: "slide_quiz::provider", error = %e, "failed to save transcript");
            }
        }
        Ok(text)
    }

    /// Streaming or batch generation in one call.
    pub async fn generate(&self, prompt: &str, system: &str, streaming: bool) -> Result<Generation, QuizError> {
        if streaming {
            self.open_stream(system, prompt).map(Generation::Deltas)
        } else {
            self.complete(system, prompt).await.map(Generation::Text)
        }
    }
}
