use std::sync::Arc;

use crate::chunker::DEFAULT_MAX_CHARS;
use crate::config::AppConfig;
use crate::provider::ProviderRegistry;

/// Shared, read-only handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<ProviderRegistry>,
    pub chunk_max_chars: usize,
}

impl AppState {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry: Arc::new(registry), chunk_max_chars: DEFAULT_MAX_CHARS }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            registry: Arc::new(ProviderRegistry::from_config(config)),
            chunk_max_chars: config.chunk_max_chars,
        }
    }
}
