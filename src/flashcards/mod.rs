//! Generated flashcard decks for Studydesk
//!
//! This module provides:
//! - Deck and card models with a bounded review cursor
//! - Extraction of a card list from free-form model output
//! - The per-subject generate/review/restart session

pub mod models;
pub mod parser;
pub mod session;

pub use models::*;
pub use parser::{parse_flashcards, PayloadError, PayloadSource};
pub use session::{
    FlashcardSession, GenerationOutcome, GenerationRequest, GenerationTicket, SessionError,
};
