//! In-memory subject store
//!
//! Holds every subject record plus the name of the subject the user is working in.
//! Two invariants hold between calls:
//! - the map is never empty (it starts with [`DEFAULT_SUBJECT`] and nothing deletes);
//! - `current_subject` is always a key of the map;
//! - every key is non-blank and carries no surrounding whitespace.
//!
//! Destructive clearing of material uses a two-step confirm: the first
//! `clear_material(name)` only arms a pending flag for `name`, the second call clears.
//! Any other successful mutation, or selecting a different subject, disarms it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::*;
use crate::flashcards::{Flashcard, FlashcardDeck};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Subject already exists: {0}")]
    DuplicateName(String),

    #[error("Subject name cannot be empty")]
    BlankName,

    #[error("Unknown subject: {0}")]
    UnknownSubject(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStore {
    subjects: BTreeMap<String, SubjectRecord>,
    current_subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending_clear: Option<String>,
}

impl Default for SubjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SubjectStore {
    /// Create a store holding only the default subject
    pub fn new() -> Self {
        let mut subjects = BTreeMap::new();
        subjects.insert(
            DEFAULT_SUBJECT.to_string(),
            SubjectRecord::new(DEFAULT_SUBJECT.to_string()),
        );
        Self {
            subjects,
            current_subject: DEFAULT_SUBJECT.to_string(),
            pending_clear: None,
        }
    }

    // ==================== Queries ====================

    /// Subject names in stable (sorted) order
    pub fn subject_names(&self) -> Vec<&str> {
        self.subjects.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.subjects.contains_key(name)
    }

    pub fn current_subject(&self) -> &str {
        &self.current_subject
    }

    pub fn pending_clear(&self) -> Option<&str> {
        self.pending_clear.as_deref()
    }

    pub fn get(&self, name: &str) -> Result<&SubjectRecord> {
        self.subjects
            .get(name)
            .ok_or_else(|| StoreError::UnknownSubject(name.to_string()))
    }

    /// Record of the current subject.
    ///
    /// Never fails while the invariants hold. If `current_subject` is stale anyway,
    /// falls back to the first subject and logs a warning instead of erroring.
    pub fn current_record(&self) -> &SubjectRecord {
        if let Some(record) = self.subjects.get(&self.current_subject) {
            return record;
        }
        log::warn!(
            "Current subject {:?} is missing from the store; falling back to the first subject",
            self.current_subject
        );
        self.subjects
            .values()
            .next()
            .expect("subject store always holds at least one subject")
    }

    // ==================== Subject Lifecycle ====================

    /// Create a subject and make it current
    pub fn create_subject(&mut self, name: &str) -> Result<&SubjectRecord> {
        let name = self.validate_new_name(name)?;

        self.pending_clear = None;
        self.subjects
            .insert(name.clone(), SubjectRecord::new(name.clone()));
        self.current_subject = name.clone();
        log::info!("Created subject {:?}", name);

        self.get(&name)
    }

    /// Make `name` the current subject. Returns whether anything changed.
    pub fn select_subject(&mut self, name: &str) -> Result<bool> {
        if !self.subjects.contains_key(name) {
            return Err(StoreError::UnknownSubject(name.to_string()));
        }
        if self.current_subject == name {
            log::debug!("Subject {:?} already selected", name);
            return Ok(false);
        }

        self.pending_clear = None;
        self.current_subject = name.to_string();
        log::info!("Selected subject {:?}", name);
        Ok(true)
    }

    /// Rename a subject; the current selection follows the record
    pub fn rename_subject(&mut self, old: &str, new: &str) -> Result<()> {
        if !self.subjects.contains_key(old) {
            return Err(StoreError::UnknownSubject(old.to_string()));
        }
        let new = self.validate_new_name(new)?;

        self.pending_clear = None;
        if let Some(mut record) = self.subjects.remove(old) {
            record.name = new.clone();
            record.touch();
            self.subjects.insert(new.clone(), record);
        }
        if self.current_subject == old {
            self.current_subject = new.clone();
        }
        log::info!("Renamed subject {:?} to {:?}", old, new);
        Ok(())
    }

    // ==================== Material ====================

    /// Replace the material wholesale (manual edit). History and deck are untouched.
    pub fn overwrite_material(&mut self, name: &str, text: &str) -> Result<()> {
        self.mutate(name, |record| {
            record.material.clear();
            if !text.is_empty() {
                record.material.push(MaterialBlock::manual(text));
            }
        })
    }

    pub fn append_material(&mut self, name: &str, block: MaterialBlock) -> Result<()> {
        self.mutate(name, |record| record.material.push(block))
    }

    /// Two-step destructive clear; see the module docs
    pub fn clear_material(&mut self, name: &str) -> Result<ClearOutcome> {
        if !self.subjects.contains_key(name) {
            return Err(StoreError::UnknownSubject(name.to_string()));
        }

        if self.pending_clear.as_deref() != Some(name) {
            self.pending_clear = Some(name.to_string());
            log::debug!("Clear of {:?} awaiting confirmation", name);
            return Ok(ClearOutcome::ConfirmationRequired);
        }

        self.pending_clear = None;
        if let Some(record) = self.subjects.get_mut(name) {
            record.material.clear();
            record.touch();
        }
        log::info!("Cleared material of {:?}", name);
        Ok(ClearOutcome::Cleared)
    }

    // ==================== History ====================

    /// Append one question/answer pair
    pub fn push_exchange(&mut self, name: &str, question: &str, answer: &str) -> Result<()> {
        self.mutate(name, |record| {
            record.history.push(HistoryEntry::new(Role::User, question));
            record.history.push(HistoryEntry::new(Role::Assistant, answer));
        })
    }

    // ==================== Flashcard Deck ====================

    /// Replace the deck wholesale, discarding any review progress
    pub fn replace_deck(&mut self, name: &str, cards: Vec<Flashcard>) -> Result<&FlashcardDeck> {
        let record = self
            .subjects
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownSubject(name.to_string()))?;
        self.pending_clear = None;
        record.touch();
        log::info!("Replaced flashcard deck of {:?} ({} cards)", name, cards.len());

        Ok(record.deck.insert(FlashcardDeck::new(cards)))
    }

    /// Move the review cursor one card forward. Returns false when there was nothing to advance.
    pub fn advance_review(&mut self, name: &str) -> Result<bool> {
        let mut advanced = false;
        self.mutate(name, |record| {
            if let Some(deck) = record.deck.as_mut() {
                advanced = deck.advance();
            }
        })?;
        Ok(advanced)
    }

    /// Rewind the review cursor to the first card without touching the cards
    pub fn restart_review(&mut self, name: &str) -> Result<()> {
        self.mutate(name, |record| {
            if let Some(deck) = record.deck.as_mut() {
                deck.restart();
            }
        })
    }

    // ==================== Internals ====================

    fn validate_new_name(&self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::BlankName);
        }
        if self.subjects.contains_key(name) {
            return Err(StoreError::DuplicateName(name.to_string()));
        }
        Ok(name.to_string())
    }

    /// Apply a mutation to one record. Disarms any pending clear.
    fn mutate<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut SubjectRecord),
    {
        let record = self
            .subjects
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownSubject(name.to_string()))?;
        f(record);
        record.touch();
        self.pending_clear = None;
        Ok(())
    }

    /// Restore the invariants after loading from disk. Returns whether anything was repaired.
    pub(crate) fn ensure_invariants(&mut self) -> bool {
        let mut repaired = false;

        if self.is_empty() {
            self.subjects.insert(
                DEFAULT_SUBJECT.to_string(),
                SubjectRecord::new(DEFAULT_SUBJECT.to_string()),
            );
            repaired = true;
        }

        let unusable: Vec<String> = self
            .subjects
            .keys()
            .filter(|key| needs_new_name(key))
            .cloned()
            .collect();
        for old in unusable {
            let Some(record) = self.subjects.remove(&old) else {
                continue;
            };
            let new = repaired_name(&old, |name| self.subjects.contains_key(name));
            log::warn!("Renaming subject {:?} to {:?}", old, new);
            self.subjects.insert(new.clone(), record);
            if self.current_subject == old {
                self.current_subject = new.clone();
            }
            if self.pending_clear.as_deref() == Some(old.as_str()) {
                self.pending_clear = Some(new);
            }
            repaired = true;
        }

        for (key, record) in self.subjects.iter_mut() {
            if record.name != *key {
                record.name = key.clone();
                repaired = true;
            }
            if let Some(deck) = record.deck.as_mut() {
                repaired |= deck.clamp_cursor();
            }
        }

        if !self.subjects.contains_key(&self.current_subject) {
            if let Some(first) = self.subjects.keys().next() {
                log::warn!(
                    "Current subject {:?} not found; reassigning to {:?}",
                    self.current_subject,
                    first
                );
                self.current_subject = first.clone();
                repaired = true;
            }
        }

        if let Some(pending) = &self.pending_clear {
            if !self.subjects.contains_key(pending) {
                self.pending_clear = None;
                repaired = true;
            }
        }

        repaired
    }
}

/// Whether a stored key breaks the naming rule `validate_new_name` enforces
pub(crate) fn needs_new_name(key: &str) -> bool {
    key.trim().is_empty() || key.trim() != key
}

/// Replacement for an unusable key: the trimmed key, or [`DEFAULT_SUBJECT`] when
/// nothing is left, numbered until it is free
pub(crate) fn repaired_name(key: &str, taken: impl Fn(&str) -> bool) -> String {
    let base = match key.trim() {
        "" => DEFAULT_SUBJECT,
        trimmed => trimmed,
    };
    if !taken(base) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{} {}", base, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(names: &[&str]) -> SubjectStore {
        let mut store = SubjectStore::new();
        for name in names {
            store.create_subject(name).unwrap();
        }
        store
    }

    #[test]
    fn test_new_store_has_default_subject() {
        let store = SubjectStore::new();
        assert_eq!(store.len(), 1);
        assert_eq!(store.current_subject(), DEFAULT_SUBJECT);
        assert_eq!(store.current_record().name, DEFAULT_SUBJECT);
    }

    #[test]
    fn test_create_grows_by_one_and_selects() {
        let mut store = SubjectStore::new();
        for (i, name) in ["Math", "History", "Biology"].iter().enumerate() {
            let record = store.create_subject(name).unwrap();
            assert!(record.material.is_empty());
            assert!(record.history.is_empty());
            assert!(record.deck.is_none());
            assert_eq!(store.len(), i + 2);
            assert_eq!(store.current_subject(), *name);
        }
    }

    #[test]
    fn test_create_rejects_blank_and_duplicate() {
        let mut store = store_with(&["Math"]);

        store
            .append_material("Math", MaterialBlock::manual("angles"))
            .unwrap();

        assert_eq!(store.create_subject("").err(), Some(StoreError::BlankName));
        assert_eq!(store.create_subject("   ").err(), Some(StoreError::BlankName));
        assert_eq!(
            store.create_subject("Math").err(),
            Some(StoreError::DuplicateName("Math".to_string()))
        );
        assert_eq!(store.len(), 2);
        assert_eq!(store.current_subject(), "Math");
        assert_eq!(store.get("Math").unwrap().material_text(), "angles");
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut store = store_with(&["Math"]);
        assert!(store.create_subject("math").is_ok());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_select_unknown_fails() {
        let mut store = SubjectStore::new();
        assert_eq!(
            store.select_subject("Nope"),
            Err(StoreError::UnknownSubject("Nope".to_string()))
        );
        assert_eq!(store.current_subject(), DEFAULT_SUBJECT);
    }

    #[test]
    fn test_select_current_is_noop() {
        let mut store = store_with(&["Math"]);
        store.clear_material("Math").unwrap();

        assert_eq!(store.select_subject("Math"), Ok(false));
        assert_eq!(store.pending_clear(), Some("Math"));
    }

    #[test]
    fn test_rename_moves_current() {
        let mut store = store_with(&["Math"]);
        store
            .append_material("Math", MaterialBlock::manual("x"))
            .unwrap();

        store.rename_subject("Math", "Algebra").unwrap();
        assert!(!store.contains("Math"));
        assert_eq!(store.current_subject(), "Algebra");
        assert_eq!(store.current_record().name, "Algebra");
        assert_eq!(store.current_record().material_text(), "x");
    }

    #[test]
    fn test_rename_validation() {
        let mut store = store_with(&["Math", "History"]);
        assert_eq!(
            store.rename_subject("Math", "History"),
            Err(StoreError::DuplicateName("History".to_string()))
        );
        assert_eq!(store.rename_subject("Math", " "), Err(StoreError::BlankName));
        assert_eq!(
            store.rename_subject("Art", "Music"),
            Err(StoreError::UnknownSubject("Art".to_string()))
        );
    }

    #[test]
    fn test_overwrite_material_keeps_history() {
        let mut store = store_with(&["Math"]);
        store.push_exchange("Math", "q", "a").unwrap();
        store
            .append_material("Math", MaterialBlock::from_source("a.pdf", "old"))
            .unwrap();

        store.overwrite_material("Math", "new text").unwrap();
        let record = store.get("Math").unwrap();
        assert_eq!(record.material_text(), "new text");
        assert_eq!(record.history.len(), 2);

        assert_eq!(
            store.overwrite_material("Nope", "x"),
            Err(StoreError::UnknownSubject("Nope".to_string()))
        );
    }

    #[test]
    fn test_clear_requires_two_calls() {
        let mut store = store_with(&["History", "Math"]);
        store
            .overwrite_material("Math", "pythagoras")
            .unwrap();

        assert_eq!(
            store.clear_material("Math"),
            Ok(ClearOutcome::ConfirmationRequired)
        );
        assert_eq!(store.get("Math").unwrap().material_text(), "pythagoras");
        assert_eq!(store.pending_clear(), Some("Math"));

        assert_eq!(store.clear_material("Math"), Ok(ClearOutcome::Cleared));
        assert_eq!(store.get("Math").unwrap().material_text(), "");
        assert_eq!(store.pending_clear(), None);
    }

    #[test]
    fn test_clear_reset_by_selecting_other_subject() {
        let mut store = store_with(&["History", "Math"]);
        store.overwrite_material("Math", "pythagoras").unwrap();

        store.clear_material("Math").unwrap();
        store.select_subject("History").unwrap();
        assert_eq!(store.pending_clear(), None);

        assert_eq!(
            store.clear_material("Math"),
            Ok(ClearOutcome::ConfirmationRequired)
        );
        assert_eq!(store.get("Math").unwrap().material_text(), "pythagoras");
    }

    #[test]
    fn test_clear_reset_by_other_mutation() {
        let mut store = store_with(&["Math"]);
        store.overwrite_material("Math", "pythagoras").unwrap();

        store.clear_material("Math").unwrap();
        store.push_exchange("Math", "q", "a").unwrap();

        assert_eq!(
            store.clear_material("Math"),
            Ok(ClearOutcome::ConfirmationRequired)
        );
        assert_eq!(store.get("Math").unwrap().material_text(), "pythagoras");
    }

    #[test]
    fn test_clear_flag_scoped_to_name() {
        let mut store = store_with(&["History", "Math"]);
        store.overwrite_material("Math", "m").unwrap();
        store.overwrite_material("History", "h").unwrap();

        store.clear_material("Math").unwrap();
        assert_eq!(
            store.clear_material("History"),
            Ok(ClearOutcome::ConfirmationRequired)
        );
        assert_eq!(store.pending_clear(), Some("History"));
        assert_eq!(store.get("Math").unwrap().material_text(), "m");
    }

    #[test]
    fn test_replace_deck_resets_cursor() {
        let mut store = store_with(&["Math"]);
        store
            .replace_deck("Math", vec![Flashcard::new("Q1", "A1"), Flashcard::new("Q2", "A2")])
            .unwrap();
        assert!(store.advance_review("Math").unwrap());
        assert_eq!(store.get("Math").unwrap().review_cursor(), 1);

        let deck = store
            .replace_deck("Math", vec![Flashcard::new("Q3", "A3")])
            .unwrap();
        assert_eq!(deck.cursor(), 0);
        assert_eq!(deck.len(), 1);
    }

    #[test]
    fn test_ensure_invariants_repairs_stale_current() {
        let mut store = store_with(&["Math"]);
        store.current_subject = "Gone".to_string();

        // Reads still work before repair; "Math" sorts before "general"
        assert_eq!(store.current_record().name, "Math");

        assert!(store.ensure_invariants());
        assert_eq!(store.current_subject(), "Math");
        assert!(!store.ensure_invariants());
    }

    #[test]
    fn test_ensure_invariants_renames_blank_keys() {
        let mut store = store_with(&["Math"]);
        let mut blank = SubjectRecord::new("  ".to_string());
        blank.material.push(MaterialBlock::manual("x"));
        store.subjects.insert("  ".to_string(), blank);
        store
            .subjects
            .insert(" Math ".to_string(), SubjectRecord::new(" Math ".to_string()));
        store.current_subject = "  ".to_string();
        store.pending_clear = Some("  ".to_string());

        assert!(store.ensure_invariants());
        assert_eq!(store.subject_names(), vec!["Math", "Math 2", "general", "general 2"]);
        assert_eq!(store.current_subject(), "general 2");
        assert_eq!(store.pending_clear(), Some("general 2"));
        let record = store.current_record();
        assert_eq!(record.name, "general 2");
        assert_eq!(record.material_text(), "x");
        assert!(!store.ensure_invariants());
    }

    #[test]
    fn test_repaired_name_numbers_until_free() {
        assert_eq!(repaired_name("", |_| false), DEFAULT_SUBJECT);
        assert_eq!(repaired_name("  Bio ", |_| false), "Bio");
        assert_eq!(
            repaired_name(" ", |name| name == "general" || name == "general 2"),
            "general 3"
        );
    }
}
