use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flashcards::FlashcardDeck;

/// Name of the subject every store starts with
pub const DEFAULT_SUBJECT: &str = "general";

/// One block of study material, tagged with where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialBlock {
    /// Uploaded file name; `None` for text typed in by hand
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub text: String,
}

impl MaterialBlock {
    pub fn from_source(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            text: text.into(),
        }
    }

    pub fn manual(text: impl Into<String>) -> Self {
        Self {
            source: None,
            text: text.into(),
        }
    }

    /// Render the block the way it is handed to the language model
    pub fn render(&self) -> String {
        match &self.source {
            Some(source) => format!("\n--- {} ---\n{}", source, self.text),
            None => self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn in a subject's conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Everything the assistant knows about one subject
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRecord {
    pub name: String,
    #[serde(default)]
    pub material: Vec<MaterialBlock>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck: Option<FlashcardDeck>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl SubjectRecord {
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            name,
            material: Vec::new(),
            history: Vec::new(),
            deck: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Concatenate all material blocks into the text sent to the model
    pub fn material_text(&self) -> String {
        self.material.iter().map(MaterialBlock::render).collect()
    }

    pub fn has_material(&self) -> bool {
        self.material.iter().any(|b| !b.text.trim().is_empty())
    }

    /// Review position in the current deck; 0 when there is no deck
    pub fn review_cursor(&self) -> usize {
        self.deck.as_ref().map(FlashcardDeck::cursor).unwrap_or(0)
    }

    /// The most recent assistant reply, if any
    pub fn last_reply(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|e| e.role == Role::Assistant)
            .map(|e| e.content.as_str())
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Result of a `clear_material` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// First call: nothing was cleared, a second call will clear
    ConfirmationRequired,
    Cleared,
}
