use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use super::migration::{self, SCHEMA_VERSION};
use crate::subjects::SubjectStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// The session file holding every subject between runs
pub struct SessionStorage {
    path: PathBuf,
}

impl SessionStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store, migrating older session shapes.
    /// A missing file yields a fresh store with only the default subject.
    pub fn load(&self) -> Result<SubjectStore> {
        if !self.path.exists() {
            log::info!("No session at {:?}, starting fresh", self.path);
            return Ok(SubjectStore::new());
        }

        let content = fs::read_to_string(&self.path)?;
        let mut value: Value = serde_json::from_str(&content)?;
        migration::normalize(&mut value);

        let mut store: SubjectStore = serde_json::from_value(value)?;
        if store.ensure_invariants() {
            log::warn!("Repaired inconsistent session loaded from {:?}", self.path);
        }
        Ok(store)
    }

    /// Save using atomic write (write to .tmp then rename)
    pub fn save(&self, store: &SubjectStore) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut value = serde_json::to_value(store)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("version".to_string(), Value::from(SCHEMA_VERSION));
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&value)?;
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        log::debug!("Saved session to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flashcards::Flashcard;
    use crate::subjects::{MaterialBlock, DEFAULT_SUBJECT};
    use tempfile::TempDir;

    fn create_test_storage() -> (SessionStorage, TempDir) {
        let temp = TempDir::new().unwrap();
        let storage = SessionStorage::new(temp.path().join("nested").join("session.json"));
        (storage, temp)
    }

    #[test]
    fn test_missing_file_gives_fresh_store() {
        let (storage, _temp) = create_test_storage();
        let store = storage.load().unwrap();
        assert_eq!(store.subject_names(), vec![DEFAULT_SUBJECT]);
        assert_eq!(store.current_subject(), DEFAULT_SUBJECT);
    }

    #[test]
    fn test_save_and_reload() {
        let (storage, _temp) = create_test_storage();

        let mut store = SubjectStore::new();
        store.create_subject("Biology").unwrap();
        store
            .append_material("Biology", MaterialBlock::from_source("cells.pdf", "Cells divide."))
            .unwrap();
        store
            .push_exchange("Biology", "What divides?", "Cells.")
            .unwrap();
        store
            .replace_deck("Biology", vec![Flashcard::new("Q", "A"), Flashcard::new("Q2", "A2")])
            .unwrap();
        store.advance_review("Biology").unwrap();
        store.clear_material("Biology").unwrap();

        storage.save(&store).unwrap();
        assert!(storage.path().exists());
        assert!(!storage.path().with_extension("json.tmp").exists());

        let raw: Value = serde_json::from_str(&fs::read_to_string(storage.path()).unwrap()).unwrap();
        assert_eq!(raw["version"], SCHEMA_VERSION);
        assert_eq!(raw["currentSubject"], "Biology");

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.current_subject(), "Biology");
        assert_eq!(loaded.pending_clear(), Some("Biology"));
        let record = loaded.get("Biology").unwrap();
        assert_eq!(record.material_text(), "\n--- cells.pdf ---\nCells divide.");
        assert_eq!(record.history.len(), 2);
        assert_eq!(record.review_cursor(), 1);
    }

    #[test]
    fn test_load_migrates_legacy_file() {
        let (storage, _temp) = create_test_storage();
        fs::create_dir_all(storage.path().parent().unwrap()).unwrap();
        fs::write(
            storage.path(),
            r#"{
                "subjects": { "History": { "material": "Rome fell in 476." } },
                "current_subject": "History",
                "flashcards": { "History": [ { "question": "When?", "answer": "476" } ] }
            }"#,
        )
        .unwrap();

        let store = storage.load().unwrap();
        assert_eq!(store.current_subject(), "History");
        let record = store.get("History").unwrap();
        assert_eq!(record.material_text(), "Rome fell in 476.");
        assert!(record.history.is_empty());
        assert_eq!(record.review_cursor(), 0);
    }

    #[test]
    fn test_load_clamps_cursor_past_deck() {
        let (storage, _temp) = create_test_storage();
        fs::create_dir_all(storage.path().parent().unwrap()).unwrap();
        fs::write(
            storage.path(),
            r#"{
                "version": 2,
                "subjects": { "Art": { "name": "Art", "material": [], "history": [],
                    "deck": { "id": "6f1c2a4e-1d6b-4b8e-9a57-2f0a4d1c9b11",
                              "cards": [ { "question": "Q", "answer": "A" } ], "cursor": 7 } } },
                "currentSubject": "Art"
            }"#,
        )
        .unwrap();

        let store = storage.load().unwrap();
        assert_eq!(store.get("Art").unwrap().review_cursor(), 1);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let (storage, _temp) = create_test_storage();
        fs::create_dir_all(storage.path().parent().unwrap()).unwrap();
        fs::write(storage.path(), "{ not json").unwrap();
        assert!(matches!(storage.load(), Err(StorageError::Json(_))));
    }
}
