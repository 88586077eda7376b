#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use slide_quiz::clients::MockClient;
use slide_quiz::server::{self, AppState};
use slide_quiz::{GenerationRequest, ProviderFamily, ProviderRegistry, SlideSet, StreamEvent};

pub const SCENARIO_SLIDES: [&str; 2] = ["Electrons carry negative charge.", "The Nile is the longest river."];

pub const SCENARIO_NDJSON: &str = concat!(
    r#"{"question":"Which particle is negative?","answer":0,"choices":["Electron","Proton"]}"#,
    "\n",
    r#"{"question":"Longest river?","answer":"Nile"}"#,
);

pub fn request(slides: &[&str]) -> GenerationRequest {
    let set = SlideSet::new(slides.iter().map(|s| s.to_string()).collect()).unwrap();
    GenerationRequest::new(set)
}

pub fn scenario_request() -> GenerationRequest {
    request(&SCENARIO_SLIDES)
}

/// Registry with the mock standing in for the OpenAI family.
pub fn openai_registry(client: MockClient) -> ProviderRegistry {
    ProviderRegistry::new("gpt-5-nano").with_client(ProviderFamily::OpenAI, client)
}

/// Split `text` into `n`-byte pieces (on char boundaries).
pub fn pieces(text: &str, n: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    for c in text.chars() {
        cur.push(c);
        if cur.len() >= n {
            out.push(std::mem::take(&mut cur));
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

pub async fn collect<S>(events: S) -> Vec<StreamEvent>
where
    S: Stream<Item = StreamEvent>,
{
    events.collect().await
}

pub async fn run_session(registry: ProviderRegistry, request: GenerationRequest) -> Vec<StreamEvent> {
    collect(slide_quiz::stream_session(Arc::new(registry), request)).await
}

pub fn answers(events: &[StreamEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Item(item) => Some(item.answer.clone()),
            _ => None,
        })
        .collect()
}

/// Serve the app on an ephemeral local port for the rest of the test.
pub async fn spawn_app(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, state, std::future::pending()));
    addr
}
