//! Normalization of session files written by older versions.
//!
//! Older sessions stored each subject as `{"material": "<one string>", "history": [...]}`,
//! kept generated flashcards in a separate top-level `flashcards` map keyed by subject and
//! named the selection `current_subject`. [`normalize`] rewrites any of those shapes into the
//! current one. Subject keys that are blank or padded with whitespace, which older versions
//! accepted, are renamed. It runs once when a session is loaded and is idempotent.

use chrono::Utc;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::flashcards::Flashcard;
use crate::subjects::{needs_new_name, repaired_name, SubjectRecord, DEFAULT_SUBJECT};

pub const SCHEMA_VERSION: u64 = 2;

/// What `normalize` had to change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Subject records rewritten into the current shape
    pub records_migrated: usize,
    /// Legacy top-level decks moved into their records
    pub decks_attached: usize,
    /// Store-level fixes (selection, default subject, schema version)
    pub repaired: bool,
}

impl MigrationReport {
    pub fn changed(&self) -> bool {
        self.records_migrated > 0 || self.decks_attached > 0 || self.repaired
    }
}

/// Bring a raw session value into the current schema
pub fn normalize(root: &mut Value) -> MigrationReport {
    let mut report = MigrationReport::default();

    if !root.is_object() {
        *root = json!({});
        report.repaired = true;
    }
    let Some(obj) = root.as_object_mut() else {
        return report;
    };

    if let Some(current) = obj.remove("current_subject") {
        if !obj.contains_key("currentSubject") {
            obj.insert("currentSubject".to_string(), current);
        }
        report.repaired = true;
    }

    let legacy_decks = obj.remove("flashcards");

    let subjects = obj
        .entry("subjects")
        .or_insert_with(|| Value::Object(Map::new()));
    if !subjects.is_object() {
        *subjects = Value::Object(Map::new());
        report.repaired = true;
    }
    let Some(subjects) = subjects.as_object_mut() else {
        return report;
    };

    for (name, record) in subjects.iter_mut() {
        if normalize_record(name, record) {
            report.records_migrated += 1;
        }
    }

    if let Some(legacy) = legacy_decks {
        report.repaired = true;
        report.decks_attached = attach_legacy_decks(subjects, legacy);
    }

    let renamed = rename_unusable_subjects(subjects);
    if !renamed.is_empty() {
        report.repaired = true;
    }

    if subjects.is_empty() {
        if let Ok(record) = serde_json::to_value(SubjectRecord::new(DEFAULT_SUBJECT.to_string())) {
            subjects.insert(DEFAULT_SUBJECT.to_string(), record);
            report.repaired = true;
        }
    }

    for key in ["currentSubject", "pendingClear"] {
        if let Some(Value::String(name)) = obj.get_mut(key) {
            if let Some((_, new)) = renamed.iter().find(|(old, _)| old == name) {
                *name = new.clone();
            }
        }
    }

    let current_valid = obj
        .get("currentSubject")
        .and_then(Value::as_str)
        .map(|name| obj_has_subject(obj, name))
        .unwrap_or(false);
    if !current_valid {
        let first = obj
            .get("subjects")
            .and_then(Value::as_object)
            .and_then(|s| s.keys().next().cloned());
        if let Some(first) = first {
            obj.insert("currentSubject".to_string(), Value::String(first));
            report.repaired = true;
        }
    }

    let pending_valid = match obj.get("pendingClear") {
        None | Some(Value::Null) => true,
        Some(Value::String(name)) => obj_has_subject(obj, name),
        Some(_) => false,
    };
    if !pending_valid {
        obj.remove("pendingClear");
        report.repaired = true;
    }

    if obj.get("version").and_then(Value::as_u64) != Some(SCHEMA_VERSION) {
        obj.insert("version".to_string(), json!(SCHEMA_VERSION));
        report.repaired = true;
    }

    if report.changed() {
        log::info!(
            "Normalized session: {} records migrated, {} legacy decks attached",
            report.records_migrated,
            report.decks_attached
        );
    }
    report
}

fn obj_has_subject(obj: &Map<String, Value>, name: &str) -> bool {
    obj.get("subjects")
        .and_then(Value::as_object)
        .map(|s| s.contains_key(name))
        .unwrap_or(false)
}

/// Rewrite one record in place. Returns whether anything changed.
fn normalize_record(name: &str, record: &mut Value) -> bool {
    let mut changed = false;

    if !record.is_object() {
        *record = json!({});
        changed = true;
    }
    let Some(obj) = record.as_object_mut() else {
        return changed;
    };

    if obj.get("name").and_then(Value::as_str) != Some(name) {
        obj.insert("name".to_string(), Value::String(name.to_string()));
        changed = true;
    }

    match obj.get("material") {
        Some(Value::Array(_)) => {}
        Some(Value::String(text)) => {
            let blocks = if text.is_empty() {
                json!([])
            } else {
                json!([{ "text": text }])
            };
            obj.insert("material".to_string(), blocks);
            changed = true;
        }
        _ => {
            obj.insert("material".to_string(), json!([]));
            changed = true;
        }
    }

    match obj.get_mut("history") {
        Some(Value::Array(entries)) => {
            let before = entries.len();
            entries.retain(is_history_entry);
            changed |= entries.len() != before;

            for entry in entries.iter_mut() {
                if let Some(entry) = entry.as_object_mut() {
                    if !entry.contains_key("timestamp") {
                        entry.insert("timestamp".to_string(), json!(Utc::now()));
                        changed = true;
                    }
                }
            }
        }
        _ => {
            obj.insert("history".to_string(), json!([]));
            changed = true;
        }
    }

    changed
}

/// Move records under blank or whitespace-padded keys to usable names. Returns `(old, new)` pairs.
fn rename_unusable_subjects(subjects: &mut Map<String, Value>) -> Vec<(String, String)> {
    let unusable: Vec<String> = subjects
        .keys()
        .filter(|key| needs_new_name(key))
        .cloned()
        .collect();

    let mut renamed = Vec::new();
    for old in unusable {
        let Some(mut record) = subjects.remove(&old) else {
            continue;
        };
        let new = repaired_name(&old, |name| subjects.contains_key(name));
        log::warn!("Renaming subject {:?} to {:?}", old, new);
        if let Some(obj) = record.as_object_mut() {
            obj.insert("name".to_string(), Value::String(new.clone()));
        }
        subjects.insert(new.clone(), record);
        renamed.push((old, new));
    }
    renamed
}

fn is_history_entry(entry: &Value) -> bool {
    let role = entry.get("role").and_then(Value::as_str);
    matches!(role, Some("user") | Some("assistant"))
        && entry.get("content").map(Value::is_string).unwrap_or(false)
}

/// Move `{subject: [cards]}` into each record's `deck`. Returns how many were attached.
fn attach_legacy_decks(subjects: &mut Map<String, Value>, legacy: Value) -> usize {
    let Value::Object(decks) = legacy else {
        return 0;
    };

    let mut attached = 0;
    for (name, cards) in decks {
        let Some(record) = subjects.get_mut(&name).and_then(Value::as_object_mut) else {
            log::warn!("Dropping legacy flashcards for unknown subject {:?}", name);
            continue;
        };
        if record.get("deck").map(|d| !d.is_null()).unwrap_or(false) {
            continue;
        }
        let cards: Vec<Flashcard> = match serde_json::from_value(cards) {
            Ok(cards) => cards,
            Err(e) => {
                log::warn!("Dropping unreadable legacy flashcards for {:?}: {}", name, e);
                continue;
            }
        };
        if cards.is_empty() {
            continue;
        }
        record.insert(
            "deck".to_string(),
            json!({
                "id": Uuid::new_v4(),
                "cards": cards,
                "cursor": 0,
                "generatedAt": Utc::now(),
            }),
        );
        attached += 1;
    }
    attached
}
