/// Chat models accepted for the OpenAI family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenAIModel {
    #[default]
    Gpt5Nano,
    Gpt5Mini,
    Gpt5,
    Gpt4oMini,
    Gpt4o,
    Gpt41,
    Gpt41Mini,
}

impl OpenAIModel {
    pub const ALL: [Self; 7] = [
        Self::Gpt5Nano,
        Self::Gpt5Mini,
        Self::Gpt5,
        Self::Gpt4oMini,
        Self::Gpt4o,
        Self::Gpt41,
        Self::Gpt41Mini,
    ];

    #[must_use]
    pub fn id(&self) -> &'static str {
        match self {
            Self::Gpt5Nano => "gpt-5-nano",
            Self::Gpt5Mini => "gpt-5-mini",
            Self::Gpt5 => "gpt-5",
            Self::Gpt4oMini => "gpt-4o-mini",
            Self::Gpt4o => "gpt-4o",
            Self::Gpt41 => "gpt-4.1",
            Self::Gpt41Mini => "gpt-4.1-mini",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }
}
