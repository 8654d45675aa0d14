//! crates/lessongen_core/src/history.rs
//!
//! The bounded, most-recent-first lesson history. The persistence boundary
//! stores the whole list as one serialized blob under a fixed key; this
//! module owns the bounding and lookup rules.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::LessonDocument;

/// Maximum number of retained lessons. Inserting beyond this evicts the
/// oldest entry.
pub const HISTORY_LIMIT: usize = 50;

/// The fixed key the serialized history lives under at the persistence
/// boundary.
pub const HISTORY_STORAGE_KEY: &str = "lessongen_history";

/// Most-recent-first list of previously generated lessons.
///
/// Serialized transparently as a plain JSON array, which is also the stored
/// wire shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LessonHistory {
    entries: Vec<LessonDocument>,
}

impl LessonHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LessonDocument] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Prepends the newest entry and evicts anything beyond the limit.
    pub fn insert(&mut self, document: LessonDocument) {
        self.entries.insert(0, document);
        self.entries.truncate(HISTORY_LIMIT);
    }

    /// Returns a copy of the entry with the given id. Callers get their own
    /// document; editing the displayed copy never mutates the stored entry.
    pub fn find(&self, id: Uuid) -> Option<LessonDocument> {
        self.entries.iter().find(|doc| doc.id == id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{sample_payload, DifficultyLevel};

    fn document(topic: &str) -> LessonDocument {
        let mut payload = sample_payload();
        payload.topic_title = topic.to_string();
        LessonDocument::from_payload(payload, DifficultyLevel::Intermediate).unwrap()
    }

    #[test]
    fn insert_is_most_recent_first() {
        let mut history = LessonHistory::new();
        history.insert(document("First"));
        history.insert(document("Second"));
        assert_eq!(history.entries()[0].content.topic_title, "Second");
        assert_eq!(history.entries()[1].content.topic_title, "First");
    }

    #[test]
    fn fifty_first_entry_evicts_the_oldest() {
        let mut history = LessonHistory::new();
        for i in 0..HISTORY_LIMIT {
            history.insert(document(&format!("Lesson {i}")));
        }
        assert_eq!(history.len(), HISTORY_LIMIT);

        history.insert(document("Newest"));
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history.entries()[0].content.topic_title, "Newest");
        // "Lesson 0" was the oldest and is gone.
        assert!(history
            .entries()
            .iter()
            .all(|doc| doc.content.topic_title != "Lesson 0"));
    }

    #[test]
    fn find_returns_an_independent_copy() {
        let mut history = LessonHistory::new();
        let doc = document("Copy on load");
        let id = doc.id;
        history.insert(doc);

        let mut loaded = history.find(id).expect("entry exists");
        loaded.content.topic_title = "Edited".to_string();
        assert_eq!(history.entries()[0].content.topic_title, "Copy on load");
    }

    #[test]
    fn find_missing_id_is_none() {
        let history = LessonHistory::new();
        assert_eq!(history.find(Uuid::new_v4()), None);
    }

    #[test]
    fn history_serializes_as_a_plain_array() {
        let mut history = LessonHistory::new();
        history.insert(document("Stored"));
        let json = serde_json::to_string(&history).unwrap();
        assert!(json.starts_with('['));
        let back: LessonHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
    }
}
