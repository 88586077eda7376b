//! Quiz generation from slide text over streaming LLM backends.
//!
//! Slides go in, normalized and deduplicated [`QuizItem`]s come out, either
//! all at once ([`generate_batch`]) or as a stream of [`StreamEvent`]s
//! ([`stream_session`]) that are emitted while the model is still writing.

pub mod chunker;
pub mod clients;
pub mod config;
pub mod core;
pub mod dedup;
pub mod error;
pub mod interceptors;
pub mod json_utils;
pub mod model;
pub mod normalize;
pub mod prompt;
pub mod provider;
pub mod server;
pub mod session;
pub mod sse;

// Convenient re-exports
pub use config::AppConfig;
pub use error::{AIError, QuizError};
pub use json_utils::{ExtractMode, IncrementalExtractor};
pub use model::{GenerationRequest, QuizItem, SlideSet, StreamEvent};
pub use provider::{ProviderFamily, ProviderRegistry};
pub use session::{generate_batch, stream_session};
