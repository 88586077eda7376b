//! Real HTTP clients against a local fake upstream.

mod test_utils;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use slide_quiz::clients::{ClaudeClient, ClaudeConfig, OpenAIClient, OpenAIConfig};
use slide_quiz::core::{LowLevelClient, PromptRequest};
use slide_quiz::error::OpenAIError;
use slide_quiz::{AIError, ProviderFamily, ProviderRegistry, StreamEvent};
use test_utils::*;

#[derive(Clone, Default)]
struct Upstream {
    bodies: Arc<Mutex<Vec<Value>>>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
}

fn sse(events: &[String]) -> Response {
    let body: String = events.iter().map(|e| format!("{e}\n\n")).collect();
    ([("content-type", "text/event-stream")], body).into_response()
}

fn openai_chunk(content: &str) -> String {
    format!("data: {}", json!({"choices": [{"delta": {"content": content}}]}))
}

async fn openai_chat(State(up): State<Upstream>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    up.bodies.lock().unwrap().push(body.clone());
    up.headers.lock().unwrap().push(headers.clone());
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer good-key") {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }
    if body["stream"] == json!(true) {
        let mut events = vec![format!("data: {}", json!({"choices": [{"delta": {"role": "assistant", "content": ""}}]}))];
        for piece in pieces(SCENARIO_NDJSON, 9) {
            events.push(openai_chunk(&piece));
        }
        events.push("data: [DONE]".to_string());
        return sse(&events);
    }
    Json(json!({
        "choices": [{"message": {"role": "assistant", "content": "{\"items\":[{\"question\":\"Q\",\"answer\":1}]}"}}]
    }))
    .into_response()
}

async fn claude_messages(State(up): State<Upstream>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    up.bodies.lock().unwrap().push(body.clone());
    up.headers.lock().unwrap().push(headers);
    if body["stream"] == json!(true) {
        let text = "Here are the questions: {\"question\":\"Which particle is negative?\",\"answer\":0,\"choices\":[\"Electron\",\"Proton\"]} {\"question\":\"Longest river?\",\"answer\":\"Nile\"}";
        let mut events = vec![
            "event: message_start\ndata: {\"type\":\"message_start\"}".to_string(),
            "event: ping\ndata: {\"type\":\"ping\"}".to_string(),
        ];
        for piece in pieces(text, 13) {
            events.push(format!(
                "event: content_block_delta\ndata: {}",
                json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": piece}})
            ));
        }
        events.push("event: message_stop\ndata: {\"type\":\"message_stop\"}".to_string());
        return sse(&events);
    }
    Json(json!({"content": [{"type": "text", "text": "{\"items\":[]}"}]})).into_response()
}

async fn spawn_upstream() -> (SocketAddr, Upstream) {
    let up = Upstream::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(openai_chat))
        .route("/v1/messages", post(claude_messages))
        .with_state(up.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    (addr, up)
}

fn openai(addr: SocketAddr, key: &str) -> OpenAIClient {
    OpenAIClient::new(OpenAIConfig {
        api_key: key.into(),
        base_url: format!("http://{addr}/v1"),
        max_completion_tokens: None,
    })
}

#[tokio::test]
async fn openai_stream_session_end_to_end() {
    let (addr, up) = spawn_upstream().await;
    let registry = ProviderRegistry::new("gpt-5-nano").with_client(ProviderFamily::OpenAI, openai(addr, "good-key"));

    let events = run_session(registry, scenario_request().with_model("gpt-4o-mini")).await;
    assert_eq!(answers(&events), vec!["Electron", "Nile"]);
    assert_eq!(events.last(), Some(&StreamEvent::Done { total: 2 }));

    let bodies = up.bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["model"], "gpt-4o-mini");
    assert_eq!(bodies[0]["stream"], true);
    assert_eq!(bodies[0]["messages"][0]["role"], "system");
}

#[tokio::test]
async fn openai_batch_call_uses_json_mode() {
    let (addr, up) = spawn_upstream().await;
    let client = openai(addr, "good-key");
    let text = client
        .ask_raw(&PromptRequest::new("gpt-5-nano", "sys", "user").json())
        .await
        .unwrap();
    assert!(text.contains("\"items\""));
    assert_eq!(up.bodies.lock().unwrap()[0]["response_format"]["type"], "json_object");
}

#[tokio::test]
async fn openai_auth_failure_is_classified() {
    let (addr, _up) = spawn_upstream().await;
    let client = openai(addr, "wrong");
    let err = client.ask_raw(&PromptRequest::new("gpt-5-nano", "s", "u")).await.unwrap_err();
    assert!(matches!(err, AIError::OpenAI(OpenAIError::Authentication)));
}

#[tokio::test]
async fn openai_stream_auth_failure_falls_back_then_errors() {
    let (addr, up) = spawn_upstream().await;
    let registry = ProviderRegistry::new("gpt-5-nano").with_client(ProviderFamily::OpenAI, openai(addr, "wrong"));

    let events = run_session(registry, scenario_request()).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], StreamEvent::Error { message } if message.contains("Authentication failed")));
    assert_eq!(up.bodies.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn claude_stream_uses_brace_scan() {
    let (addr, up) = spawn_upstream().await;
    let client = ClaudeClient::new(ClaudeConfig {
        api_key: "claude-key".into(),
        base_url: format!("http://{addr}/v1"),
        max_tokens: 2048,
    });
    let registry = ProviderRegistry::new("claude-3-5-haiku-latest").with_client(ProviderFamily::Claude, client);

    let events = run_session(registry, scenario_request()).await;
    assert_eq!(answers(&events), vec!["Electron", "Nile"]);
    assert_eq!(events.last(), Some(&StreamEvent::Done { total: 2 }));

    let headers = up.headers.lock().unwrap();
    assert_eq!(headers[0]["x-api-key"], "claude-key");
    assert_eq!(headers[0]["anthropic-version"], "2023-06-01");
    let bodies = up.bodies.lock().unwrap();
    assert_eq!(bodies[0]["model"], "claude-3-5-haiku-latest");
    assert_eq!(bodies[0]["max_tokens"], 2048);
}
