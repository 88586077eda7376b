//! Generation sessions: the streaming state machine and the chunked batch path.
//!
//! A streaming session moves through `STREAMING`, optionally `FALLBACK`, and
//! ends with exactly one `Done` or `Error` event. Each session owns its
//! extractor buffer and [`SeenQuestions`]; nothing is shared between sessions
//! except the read-only [`ProviderRegistry`].

use std::sync::Arc;

use async_stream::stream;
use futures_core::Stream;
use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::chunker::chunk_slides;
use crate::dedup::SeenQuestions;
use crate::error::QuizError;
use crate::json_utils::{expand_candidate, extract_candidates, parse_batch_response};
use crate::model::{GenerationRequest, QuizItem, StreamEvent};
use crate::normalize::normalize;
use crate::prompt::{instructions, user_prompt, PromptStyle};
use crate::provider::{ProviderRegistry, ResolvedProvider};

/// Normalize candidates and keep the ones not seen before, in order.
fn accept_all(candidates: Vec<Value>, seen: &mut SeenQuestions) -> Vec<QuizItem> {
    candidates
        .iter()
        .filter_map(normalize)
        .filter(|item| seen.accept(item))
        .collect()
}

async fn fallback_items(
    provider: &ResolvedProvider,
    request: &GenerationRequest,
    seen: &mut SeenQuestions,
) -> Result<Vec<QuizItem>, QuizError> {
    let system = instructions(PromptStyle::Json);
    let user = user_prompt(request.slides.as_slice(), request.target_count, PromptStyle::Json);
    let text = provider.complete(&system, &user).await?;
    Ok(accept_all(parse_batch_response(&text), seen))
}

/// Run one streaming session.
///
/// Items are yielded as soon as they are accepted. A provider failure while
/// streaming (or a backend without a stream) switches once to a single batch
/// call; items already yielded are kept and count towards dedup. Dropping the
/// returned stream drops the provider connection.
pub fn stream_session(
    registry: Arc<ProviderRegistry>,
    request: GenerationRequest,
) -> impl Stream<Item = StreamEvent> + Send {
    stream! {
        let provider = match registry.resolve(request.model_id.as_deref()) {
            Ok(p) => p,
            Err(e) => {
                warn!(target: "slide_quiz::session", error = %e, "session rejected");
                yield StreamEvent::Error { message: e.to_string() };
                return;
            }
        };
        info!(
            target: "slide_quiz::session",
            model = %provider.model(),
            slides = request.slides.len(),
            "streaming session started"
        );

        let mut seen = SeenQuestions::new();
        let system = instructions(PromptStyle::Stream);
        let user = user_prompt(request.slides.as_slice(), request.target_count, PromptStyle::Stream);

        let needs_fallback = match provider.open_stream(&system, &user) {
            Ok(deltas) => {
                let mut candidates = Box::pin(extract_candidates(deltas, provider.extract_mode()));
                let mut failed = false;
                while let Some(candidate) = candidates.next().await {
                    match candidate {
                        Ok(value) => {
                            for item in accept_all(expand_candidate(value), &mut seen) {
                                yield StreamEvent::Item(item);
                            }
                        }
                        Err(e) => {
                            warn!(target: "slide_quiz::session", error = %e, emitted = seen.len(), "stream failed, falling back to batch");
                            failed = true;
                            break;
                        }
                    }
                }
                failed
            }
            Err(e) => {
                debug!(target: "slide_quiz::session", error = %e, "no stream, using batch");
                true
            }
        };

        if needs_fallback {
            match fallback_items(&provider, &request, &mut seen).await {
                Ok(items) => {
                    for item in items {
                        yield StreamEvent::Item(item);
                    }
                }
                Err(e) => {
                    warn!(target: "slide_quiz::session", error = %e, "fallback failed");
                    yield StreamEvent::Error { message: e.to_string() };
                    return;
                }
            }
        }

        info!(target: "slide_quiz::session", total = seen.len(), fallback = needs_fallback, "session done");
        yield StreamEvent::Done { total: seen.len() };
    }
}

/// Batch generation: one provider call per slide chunk, one dedup pass over
/// the merged items.
#[instrument(target = "slide_quiz::session", skip(registry, request), fields(slides = request.slides.len(), model = ?request.model_id))]
pub async fn generate_batch(
    registry: &ProviderRegistry,
    request: &GenerationRequest,
    chunk_max_chars: usize,
) -> Result<Vec<QuizItem>, QuizError> {
    let provider = registry.resolve(request.model_id.as_deref())?;
    let system = instructions(PromptStyle::Json);

    let mut items = Vec::new();
    for group in chunk_slides(request.slides.as_slice(), chunk_max_chars) {
        let user = user_prompt(group, request.target_count, PromptStyle::Json);
        let text = provider.complete(&system, &user).await?;
        items.extend(parse_batch_response(&text).iter().filter_map(normalize));
    }

    let unique = SeenQuestions::new().retain_unique(items);
    info!(target: "slide_quiz::session", total = unique.len(), "batch done");
    Ok(unique)
}

/// The event sequence a streaming client would have seen for a batch result.
pub fn events_from_items(items: Vec<QuizItem>) -> Vec<StreamEvent> {
    let total = items.len();
    items
        .into_iter()
        .map(StreamEvent::Item)
        .chain(std::iter::once(StreamEvent::Done { total }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accept_all_drops_malformed_and_duplicates() {
        let mut seen = SeenQuestions::new();
        let items = accept_all(
            vec![
                json!({"question": "Q1", "answer": 0}),
                json!("not an object"),
                json!({"question": "  q1 ", "answer": 1}),
                json!({"question": ""}),
                json!({"question": "Q2", "answer": "x"}),
            ],
            &mut seen,
        );
        let questions: Vec<_> = items.iter().map(|i| i.question.as_str()).collect();
        assert_eq!(questions, vec!["Q1", "Q2"]);
        assert_eq!(items[0].answer, "True");
    }

    #[test]
    fn batch_events_end_with_done() {
        let item = QuizItem {
            question: "Q".into(),
            answer: "A".into(),
            choices: vec![],
            explanation: String::new(),
            tags: vec![],
        };
        let events = events_from_items(vec![item.clone()]);
        assert_eq!(events, vec![StreamEvent::Item(item), StreamEvent::Done { total: 1 }]);
        assert_eq!(events_from_items(vec![]), vec![StreamEvent::Done { total: 0 }]);
    }
}
