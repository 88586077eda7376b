//! System instructions and user prompts sent to the model.

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

/// Shape the model is asked to emit for one question.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ModelQuestion {
    /// Concise, self-contained question text.
    pub question: String,
    /// Index of the correct entry in `choices`. For True/False use 0 for True and 1 for False.
    pub answer: u32,
    /// 3-4 options for multiple choice, `["True","False"]` for True/False.
    pub choices: Vec<String>,
    /// Optional short justification.
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Which output format the prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    /// One JSON document `{"items":[...]}`.
    Json,
    /// NDJSON, one compact object per line.
    Stream,
}

const RULES: &str = "Rules:
- Prefer concise, unambiguous phrasing.
- MCQ and T/F only. 3-4 choices for MCQ, 0/1 for T/F.
- Focus on definitions, formulas, processes, comparisons, and pitfalls.
- No external facts; use only provided slides.
- Keep each question self-contained.";

fn item_schema() -> String {
    let schema = schema_for!(ModelQuestion);
    serde_json::to_string(&schema).unwrap_or_else(|_| {
        r#"{"question":"string","answer":0,"choices":["string"],"explanation":"string","tags":["string"]}"#.to_string()
    })
}

/// System instructions for batch and fallback calls.
pub fn json_instructions() -> String {
    format!(
        "You generate exam-style questions from slide text.\n\
         Return STRICT JSON of the form {{\"items\":[ ... ]}} where every item matches this JSON schema:\n\
         {}\n\n{}",
        item_schema(),
        RULES
    )
}

/// System instructions for streaming calls.
pub fn stream_instructions() -> String {
    format!(
        "You generate exam-style questions from slide text.\n\
         STREAM output as NDJSON (one JSON object per line). Do NOT wrap with an array.\n\
         Each line must be a single compact JSON object matching this JSON schema:\n\
         {}\n\n{}\n- Output one JSON object per line.",
        item_schema(),
        RULES
    )
}

pub fn instructions(style: PromptStyle) -> String {
    match style {
        PromptStyle::Json => json_instructions(),
        PromptStyle::Stream => stream_instructions(),
    }
}

/// User message carrying the slides.
pub fn user_prompt(slides: &[String], target: Option<u32>, style: PromptStyle) -> String {
    let mut prompt = format!("Slides text:\n{}\n\n", slides.join("\n---\n"));
    prompt.push_str(match style {
        PromptStyle::Json => "Produce JSON now.",
        PromptStyle::Stream => "Stream NDJSON now.",
    });
    if let Some(n) = target {
        prompt.push_str(&format!(" Generate about {n} total questions."));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_joins_slides() {
        let slides = vec!["A".to_string(), "B".to_string()];
        assert_eq!(
            user_prompt(&slides, None, PromptStyle::Json),
            "Slides text:\nA\n---\nB\n\nProduce JSON now."
        );
        assert_eq!(
            user_prompt(&slides, Some(12), PromptStyle::Stream),
            "Slides text:\nA\n---\nB\n\nStream NDJSON now. Generate about 12 total questions."
        );
    }

    #[test]
    fn instructions_describe_item_shape() {
        let json = json_instructions();
        assert!(json.contains("{\"items\":[ ... ]}"));
        assert!(json.contains("\"question\""));
        assert!(json.contains("\"choices\""));

        let ndjson = instructions(PromptStyle::Stream);
        assert!(ndjson.contains("NDJSON"));
        assert!(ndjson.contains("\"answer\""));
        assert!(!ndjson.contains("STRICT JSON"));
    }
}
