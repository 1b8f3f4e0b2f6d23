//! Studydesk: a personal study assistant.
//!
//! Material is organised into named subjects. Each subject keeps its uploaded text, a chat
//! history with the language model and at most one generated flashcard deck.

pub mod ai;
pub mod assistant;
pub mod config;
pub mod flashcards;
pub mod ingest;
pub mod speech;
pub mod storage;
pub mod subjects;

pub use assistant::{StudyAssistant, StudyReply};
pub use config::AppConfig;
pub use subjects::{StoreError, SubjectStore};
