use std::convert::Infallible;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use super::error::AppResult;
use super::state::AppState;
use crate::error::QuizError;
use crate::model::{parse_target, GenerationRequest, QuizItem, SlideSet, StreamEvent};
use crate::session::{generate_batch, stream_session};

/// Body shared by both generation endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateBody {
    #[serde(default)]
    pub slides: Option<Vec<String>>,
    #[serde(default)]
    pub model: Option<String>,
    /// Number or numeric string; anything else is ignored.
    #[serde(default)]
    pub target: Option<Value>,
}

impl GenerateBody {
    pub fn into_request(self) -> Result<GenerationRequest, QuizError> {
        let slides = SlideSet::new(self.slides.unwrap_or_default())?;
        let mut request = GenerationRequest::new(slides);
        if let Some(model) = self.model {
            request = request.with_model(model);
        }
        if let Some(n) = parse_target(self.target.as_ref()) {
            request = request.with_target(n);
        }
        Ok(request)
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub items: Vec<QuizItem>,
}

pub async fn health() -> &'static str {
    "ok"
}

#[instrument(target = "slide_quiz::server", skip_all)]
pub async fn generate_quiz(
    State(state): State<AppState>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> AppResult<Json<GenerateResponse>> {
    let Json(body) = body?;
    let request = body.into_request()?;
    info!(target: "slide_quiz::server", slides = request.slides.len(), model = ?request.model_id, "batch request");
    let items = generate_batch(&state.registry, &request, state.chunk_max_chars).await?;
    Ok(Json(GenerateResponse { items }))
}

fn to_sse(event: &StreamEvent) -> Event {
    Event::default().event(event.kind()).data(event.payload().to_string())
}

/// Invalid input is rejected before any SSE header is sent. Everything after
/// that, provider errors included, arrives as events.
#[instrument(target = "slide_quiz::server", skip_all)]
pub async fn generate_quiz_stream(
    State(state): State<AppState>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(body) = body?;
    let request = body.into_request()?;
    info!(target: "slide_quiz::server", slides = request.slides.len(), model = ?request.model_id, "stream request");

    let events = stream_session(state.registry.clone(), request).map(|ev| Ok::<_, Infallible>(to_sse(&ev)));
    let headers = [
        (header::CACHE_CONTROL, "no-cache"),
        (HeaderName::from_static("x-accel-buffering"), "no"),
    ];
    Ok((headers, Sse::new(events).keep_alive(KeepAlive::default())))
}
