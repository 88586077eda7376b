use std::collections::HashSet;

use crate::model::QuizItem;

/// Lower-cased, trimmed question text.
pub fn dedup_key(question: &str) -> String {
    question.trim().to_lowercase()
}

/// Questions already accepted in one generation session.
///
/// Owned by the session that created it; never shared between sessions.
#[derive(Debug, Default)]
pub struct SeenQuestions {
    keys: HashSet<String>,
}

impl SeenQuestions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the item's key. Returns `false` for empty or repeated keys.
    pub fn accept(&mut self, item: &QuizItem) -> bool {
        let key = dedup_key(&item.question);
        if key.is_empty() {
            return false;
        }
        self.keys.insert(key)
    }

    /// Number of accepted items.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keep the first occurrence of every key, in order.
    pub fn retain_unique(&mut self, items: Vec<QuizItem>) -> Vec<QuizItem> {
        items.into_iter().filter(|it| self.accept(it)).collect()
    }
}
