//! Subjects: named folders of study material, conversation history and flashcards

mod models;
mod store;

pub use models::*;
pub use store::{StoreError, SubjectStore};
pub(crate) use store::{needs_new_name, repaired_name};
