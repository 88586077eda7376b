use async_trait::async_trait;
use std::fmt::Debug;

/// Receives every completed batch-mode exchange with a provider.
#[async_trait]
pub trait Interceptor: Send + Sync + Debug {
    async fn save(&self, model: &str, prompt: &str, response: &str) -> std::io::Result<()>;
}

pub mod file;
pub use file::FileInterceptor;
