//! Data models for generated flashcard decks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single question/answer pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

impl Flashcard {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A generated deck together with its review cursor.
///
/// The cursor always satisfies `0 <= cursor <= cards.len()`; `cursor == cards.len()`
/// means the deck has been reviewed to the end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardDeck {
    pub id: Uuid,
    pub cards: Vec<Flashcard>,
    #[serde(default)]
    cursor: usize,
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
}

impl FlashcardDeck {
    pub fn new(cards: Vec<Flashcard>) -> Self {
        Self {
            id: Uuid::new_v4(),
            cards,
            cursor: 0,
            generated_at: Utc::now(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// The card under the cursor, if the deck is not exhausted
    pub fn current(&self) -> Option<&Flashcard> {
        self.cards.get(self.cursor)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.cards.len()
    }

    /// Move past the current card. Returns false when already at the end.
    pub fn advance(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn restart(&mut self) {
        self.cursor = 0;
    }

    /// Pull a cursor loaded from disk back into range
    pub(crate) fn clamp_cursor(&mut self) -> bool {
        if self.cursor > self.cards.len() {
            self.cursor = self.cards.len();
            return true;
        }
        false
    }
}

/// How the user rated a card during review.
///
/// Both outcomes advance the cursor by one; no scheduling weight is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewOutcome {
    Remembered,
    Forgot,
}

/// Lifecycle of the deck attached to one subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum DeckState {
    /// No deck has been generated yet
    NoDeck,
    /// A generation request is outstanding for this subject
    Generating,
    /// A card is under the cursor; `Ready` and `Reviewing` collapse into this state
    Reviewing { cursor: usize, total: usize },
    /// Every card has been rated
    Exhausted { total: usize },
}

impl DeckState {
    pub fn of(deck: Option<&FlashcardDeck>) -> Self {
        match deck {
            None => Self::NoDeck,
            Some(deck) if deck.is_exhausted() => Self::Exhausted { total: deck.len() },
            Some(deck) => Self::Reviewing {
                cursor: deck.cursor(),
                total: deck.len(),
            },
        }
    }
}
