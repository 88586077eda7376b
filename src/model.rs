//! Data carried through a generation session: the slide input, the request,
//! canonical quiz items and the events a session emits.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::QuizError;

/// Ordered slide texts, one per source page. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideSet {
    slides: Vec<String>,
}

impl SlideSet {
    /// Build a slide set, dropping slides that are blank after trimming.
    pub fn new(slides: Vec<String>) -> Result<Self, QuizError> {
        let slides: Vec<String> = slides
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect();
        if slides.is_empty() {
            return Err(QuizError::InvalidInput("slides[] required".to_string()));
        }
        Ok(Self { slides })
    }

    /// Split plain text into slides on form feeds and `---` lines.
    pub fn from_text(text: &str) -> Result<Self, QuizError> {
        let mut slides = Vec::new();
        for page in text.split('\u{c}') {
            let mut current = String::new();
            for line in page.lines() {
                if line.trim() == "---" {
                    slides.push(std::mem::take(&mut current));
                } else {
                    current.push_str(line);
                    current.push('\n');
                }
            }
            slides.push(current);
        }
        Self::new(slides.into_iter().map(|s| s.trim().to_string()).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.slides
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}

/// One client-initiated generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub slides: SlideSet,
    /// Requested model; validated against the provider allow-lists at resolve time.
    pub model_id: Option<String>,
    /// Soft hint for how many questions to ask for.
    pub target_count: Option<u32>,
}

impl GenerationRequest {
    pub fn new(slides: SlideSet) -> Self {
        Self { slides, model_id: None, target_count: None }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_id = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: u32) -> Self {
        self.target_count = (target > 0).then_some(target);
        self
    }
}

/// Interpret a loosely-typed `target` field: positive numbers (or numeric
/// strings) are floored, everything else means "no hint".
pub fn parse_target(raw: Option<&Value>) -> Option<u32> {
    let n = match raw? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() || n < 1.0 {
        return None;
    }
    Some(n.floor().min(f64::from(u32::MAX)) as u32)
}

/// Canonical quiz question. `answer` is always display text, never an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Events emitted by a streaming session. Exactly one `Done` or `Error`
/// closes every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Item(QuizItem),
    Done { total: usize },
    Error { message: String },
}

impl StreamEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Item(_) => "item",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    /// JSON body carried in the event's `data:` lines.
    pub fn payload(&self) -> Value {
        match self {
            Self::Item(item) => json!({ "item": item }),
            Self::Done { total } => json!({ "total": total }),
            Self::Error { message } => json!({ "error": message }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Item(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slides_from_text() {
        let set = SlideSet::from_text("Intro\nline two\n---\nSecond\u{c}Third\n---\n\n").unwrap();
        assert_eq!(set.as_slice(), &["Intro\nline two".to_string(), "Second".to_string(), "Third".to_string()]);
        assert!(SlideSet::from_text("---\n\u{c}\n").is_err());
    }

    #[test]
    fn blank_slides_are_dropped() {
        let set = SlideSet::new(vec!["  ".into(), "a".into(), "\n".into(), "b".into()]).unwrap();
        assert_eq!(set.as_slice(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn empty_slides_are_invalid() {
        assert!(matches!(SlideSet::new(vec![]), Err(QuizError::InvalidInput(_))));
        assert!(matches!(SlideSet::new(vec![" ".into()]), Err(QuizError::InvalidInput(_))));
    }

    #[test]
    fn target_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_target(Some(&json!(12))), Some(12));
        assert_eq!(parse_target(Some(&json!(7.9))), Some(7));
        assert_eq!(parse_target(Some(&json!("5"))), Some(5));
        assert_eq!(parse_target(Some(&json!(0))), None);
        assert_eq!(parse_target(Some(&json!(-3))), None);
        assert_eq!(parse_target(Some(&json!("many"))), None);
        assert_eq!(parse_target(None), None);
    }

    #[test]
    fn event_payloads_match_wire_shape() {
        assert_eq!(StreamEvent::Done { total: 2 }.payload(), json!({"total": 2}));
        assert_eq!(
            StreamEvent::Error { message: "boom".into() }.payload(),
            json!({"error": "boom"})
        );
        assert!(StreamEvent::Done { total: 0 }.is_terminal());
    }
}
