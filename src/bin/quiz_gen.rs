use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use futures_util::StreamExt;
use serde_json::json;
use slide_quiz::session::events_from_items;
use slide_quiz::{generate_batch, stream_session, AppConfig, GenerationRequest, ProviderRegistry, SlideSet, StreamEvent};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Generate quiz questions from a slide text file", long_about = None)]
#[command(after_help = "Slides are separated by form feeds or lines containing only `---`.
Each event is printed as one JSON line: {\"event\":\"item\",\"data\":{\"item\":{...}}}")]
struct Args {
    /// Text file holding the slides
    #[arg(short, long)]
    slides: PathBuf,

    /// Model id
    #[arg(short, long)]
    model: Option<String>,

    /// Approximate number of questions
    #[arg(short, long)]
    target: Option<u32>,

    /// Use the chunked batch path instead of streaming
    #[arg(long)]
    batch: bool,
}

fn print_event(event: &StreamEvent) {
    println!("{}", json!({ "event": event.kind(), "data": event.payload() }));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let text = tokio::fs::read_to_string(&args.slides)
        .await
        .with_context(|| format!("failed to read {}", args.slides.display()))?;

    let mut request = GenerationRequest::new(SlideSet::from_text(&text)?);
    if let Some(model) = args.model {
        request = request.with_model(model);
    }
    if let Some(n) = args.target {
        request = request.with_target(n);
    }

    let config = AppConfig::from_env();
    let registry = ProviderRegistry::from_config(&config);

    if args.batch {
        let items = generate_batch(&registry, &request, config.chunk_max_chars).await?;
        for event in events_from_items(items) {
            print_event(&event);
        }
        return Ok(());
    }

    let mut events = Box::pin(stream_session(Arc::new(registry), request));
    let mut failed = None;
    while let Some(event) = events.next().await {
        print_event(&event);
        if let StreamEvent::Error { message } = event {
            failed = Some(message);
        }
    }
    match failed {
        Some(message) => anyhow::bail!(message),
        None => Ok(()),
    }
}
