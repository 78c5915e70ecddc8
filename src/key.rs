//! Document path management utilities.
//!
//! Layout:
//!
//! ```text
//! events/{event_id}
//! events/{event_id}/items/{item_id}
//! events/{event_id}/participants/{participant_id}
//! ```

use crate::entity::Record;

/// Top-level collection holding event documents.
pub const EVENTS: &str = "events";

/// Builder for document paths.
pub struct DocumentPath;

impl DocumentPath {
    /// Path of an event document.
    pub fn event(event_id: &str) -> String {
        Self::build_composite(&[EVENTS, event_id])
    }

    /// Path of a record collection nested under an event.
    pub fn collection<T: Record>(event_id: &str) -> String {
        Self::build_composite(&[EVENTS, event_id, T::collection()])
    }

    /// Path of a single record nested under an event.
    pub fn record<T: Record>(event_id: &str, record_id: &str) -> String {
        Self::build_composite(&[EVENTS, event_id, T::collection(), record_id])
    }

    /// Build composite path from multiple parts.
    pub fn build_composite(parts: &[&str]) -> String {
        parts.join("/")
    }

    /// Parse a composite path into parts.
    pub fn parse(path: &str) -> Vec<&str> {
        path.split('/').collect()
    }

    /// Last segment of a path, which is the record id.
    pub fn id_of(path: &str) -> &str {
        path.rsplit('/').next().unwrap_or(path)
    }

    /// Whether `path` is a direct child of `collection`.
    pub fn is_child_of(path: &str, collection: &str) -> bool {
        path.strip_prefix(collection)
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|id| !id.is_empty() && !id.contains('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Item, Participant};

    #[test]
    fn test_event_path() {
        assert_eq!(DocumentPath::event("evt_1"), "events/evt_1");
    }

    #[test]
    fn test_record_paths() {
        assert_eq!(
            DocumentPath::record::<Item>("evt_1", "item_9"),
            "events/evt_1/items/item_9"
        );
        assert_eq!(
            DocumentPath::collection::<Participant>("evt_1"),
            "events/evt_1/participants"
        );
    }

    #[test]
    fn test_composite_path_parser() {
        let parts = DocumentPath::parse("events/evt_1/items/item_9");
        assert_eq!(parts, vec!["events", "evt_1", "items", "item_9"]);
        assert_eq!(DocumentPath::id_of("events/evt_1/items/item_9"), "item_9");
    }

    #[test]
    fn test_is_child_of() {
        let items = "events/evt_1/items";
        assert!(DocumentPath::is_child_of("events/evt_1/items/a", items));
        assert!(!DocumentPath::is_child_of("events/evt_1/items", items));
        assert!(!DocumentPath::is_child_of("events/evt_1/items/a/b", items));
        assert!(!DocumentPath::is_child_of("events/evt_1/itemsx/a", items));
        assert!(!DocumentPath::is_child_of("events/evt_10/items/a", items));
    }
}
