/// Claude models accepted for the Anthropic family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClaudeModel {
    #[default]
    Haiku35,
    Sonnet37,
    Sonnet4,
    Opus4,
}

impl ClaudeModel {
    pub const ALL: [Self; 4] = [Self::Haiku35, Self::Sonnet37, Self::Sonnet4, Self::Opus4];

    #[must_use]
    pub fn id(&self) -> &'static str {
        match self {
            Self::Haiku35 => "claude-3-5-haiku-latest",
            Self::Sonnet37 => "claude-3-7-sonnet-latest",
            Self::Sonnet4 => "claude-sonnet-4-20250514",
            Self::Opus4 => "claude-opus-4-20250514",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }
}
