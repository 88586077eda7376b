use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use slide_quiz::server::{self, AppState};
use slide_quiz::AppConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Quiz generation server (batch + SSE)", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    PORT                   Listen port [default: 5050]
    QUIZ_DEFAULT_MODEL     Model used when a request names none or an unknown one
    QUIZ_CHUNK_MAX_CHARS   Slide characters per batch request [default: 7000]
    QUIZ_TRANSCRIPT_DIR    Write every batch prompt/response pair here
    OPENAI_API_KEY         Enables the OpenAI family
    ANTHROPIC_API_KEY      Enables the Anthropic family
    DEEPSEEK_API_KEY       Enables the DeepSeek family
    RUST_LOG               Log filter [default: info]")]
struct Args {
    /// Address to bind
    #[arg(long)]
    host: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Default model id
    #[arg(short = 'm', long)]
    default_model: Option<String>,

    /// Character budget per batch chunk
    #[arg(long)]
    chunk_max_chars: Option<usize>,

    /// Directory for prompt/response transcripts
    #[arg(long)]
    transcript_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(model) = args.default_model {
        config.default_model = model;
    }
    if let Some(n) = args.chunk_max_chars.filter(|n| *n > 0) {
        config.chunk_max_chars = n;
    }
    if args.transcript_dir.is_some() {
        config.transcript_dir = args.transcript_dir;
    }

    let state = AppState::from_config(&config);
    if state.registry.configured().is_empty() {
        warn!("no provider credentials found; every request will fail with a configuration error");
    }
    info!(addr = %config.bind_addr(), default_model = %config.default_model, "starting quiz server");

    server::start(config.bind_addr(), state)
        .await
        .context("quiz server failed")
}
