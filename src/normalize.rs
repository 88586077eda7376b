//! Maps model-emitted objects onto [`QuizItem`].
//!
//! Models are asked for a choice index (or 0/1 for True/False) in `answer`,
//! but they also emit the answer text itself, out-of-range indices, digit
//! strings and other types. Everything is resolved here so downstream code
//! only ever sees display strings.

use serde_json::{Number, Value};

use crate::model::QuizItem;

/// Normalize one candidate. Returns `None` when the candidate is not an object
/// or its question is empty after coercion and trimming.
pub fn normalize(candidate: &Value) -> Option<QuizItem> {
    let obj = candidate.as_object()?;

    let question = match obj.get("question") {
        None | Some(Value::Null) => return None,
        Some(q) => coerce_string(q).trim().to_string(),
    };
    if question.is_empty() {
        return None;
    }

    let choices: Vec<String> = string_list(obj.get("choices"));
    let answer = resolve_answer(obj.get("answer"), obj.get("choices").and_then(Value::as_array));

    Some(QuizItem {
        question,
        answer,
        choices,
        explanation: obj.get("explanation").map(coerce_string).unwrap_or_default(),
        tags: string_list(obj.get("tags")),
    })
}

/// Resolve the polymorphic `answer` field into display text.
pub fn resolve_answer(answer: Option<&Value>, choices: Option<&Vec<Value>>) -> String {
    match answer {
        Some(Value::Number(n)) => {
            let index = n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64));
            index
                .and_then(|i| resolve_index(i, choices))
                .unwrap_or_else(|| number_text(n))
        }
        Some(Value::String(s)) => match single_digit_index(s) {
            Some(i) => resolve_index(i, choices).unwrap_or_else(|| s.clone()),
            None => s.clone(),
        },
        Some(other) => coerce_string(other),
        None => String::new(),
    }
}

/// Choice lookup first, then the True/False convention for 0 and 1.
fn resolve_index(index: u64, choices: Option<&Vec<Value>>) -> Option<String> {
    if let Some(choices) = choices {
        if let Some(choice) = usize::try_from(index).ok().and_then(|i| choices.get(i)) {
            return Some(coerce_string(choice));
        }
    }
    match index {
        0 => Some("True".to_string()),
        1 => Some("False".to_string()),
        _ => None,
    }
}

/// A string consisting of one digit 0-3, surrounding whitespace allowed.
fn single_digit_index(s: &str) -> Option<u64> {
    let t = s.trim();
    let mut chars = t.chars();
    match (chars.next(), chars.next()) {
        (Some(c @ '0'..='3'), None) => c.to_digit(10).map(u64::from),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().map(coerce_string).collect())
        .unwrap_or_default()
}

/// Render any JSON value as display text. Strings are taken verbatim,
/// `null` becomes empty, compound values keep their JSON form.
pub fn coerce_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        other => other.to_string(),
    }
}

/// Integral floats render without a fractional part (`5.0` → `5`).
fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}
