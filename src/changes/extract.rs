//! Change extraction

use crate::document::{ChangeType, DocNode, Mark, NodePath, Resolution, TrackChange};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// One tracked insertion or deletion, derived from a document snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub id: String,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub text: String,
    pub author_id: String,
    pub author_name: String,
    pub timestamp_ms: i64,
    /// Path of the first text leaf of the change
    pub source_path: NodePath,
    pub resolution: Resolution,
}

impl Change {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_ms).single()
    }
}

/// Extract the change list from a document, in document order
///
/// One entry per change id, ordered by first appearance. Every tracked mark
/// on a text leaf counts, so a leaf inserted by one author and deleted by
/// another contributes to both changes. Text leaves sharing a change id are
/// concatenated, across block boundaries too. Malformed marks are skipped.
pub fn extract_changes(root: &DocNode) -> Vec<Change> {
    let mut extractor = Extractor::default();
    let mut path = Vec::new();
    extractor.walk(root, &mut path);
    extractor.changes
}

#[derive(Default)]
struct Extractor {
    changes: Vec<Change>,
    by_id: HashMap<String, usize>,
    warned: HashSet<String>,
}

impl Extractor {
    fn walk(&mut self, node: &DocNode, path: &mut NodePath) {
        if node.is_text() {
            self.visit_text(node, path);
            return;
        }
        for (index, child) in node.children.iter().enumerate() {
            path.push(index);
            self.walk(child, path);
            path.pop();
        }
    }

    fn visit_text(&mut self, node: &DocNode, path: &NodePath) {
        let mut seen: Vec<(String, ChangeType)> = Vec::new();
        for tc in node.marks.iter().filter_map(Mark::track_change) {
            let key = (tc.change_id.clone(), tc.change_type);
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);

            let text = tc.deleted_text.as_deref().unwrap_or(node.text_content());
            if !text.is_empty() {
                self.record(&tc, text, path);
            }
        }
    }

    fn record(&mut self, tc: &TrackChange, text: &str, path: &NodePath) {
        let Some(index) = self.by_id.get(&tc.change_id).copied() else {
            self.by_id.insert(tc.change_id.clone(), self.changes.len());
            self.changes.push(Change {
                id: tc.change_id.clone(),
                change_type: tc.change_type,
                text: text.to_string(),
                author_id: tc.author_id.clone(),
                author_name: tc.author_name.clone(),
                timestamp_ms: tc.timestamp_ms,
                source_path: path.clone(),
                resolution: tc.resolution,
            });
            return;
        };

        let existing = &mut self.changes[index];
        if existing.change_type != tc.change_type {
            if self.warned.insert(tc.change_id.clone()) {
                warn!(
                    change_id = %tc.change_id,
                    first = %existing.change_type,
                    conflicting = %tc.change_type,
                    "change id reused with a different change type; ignoring later text"
                );
            }
            return;
        }
        if existing.author_id != tc.author_id && self.warned.insert(tc.change_id.clone()) {
            warn!(
                change_id = %tc.change_id,
                kept = %existing.author_id,
                ignored = %tc.author_id,
                "author differs across one change; keeping first author"
            );
        }
        existing.text.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Author;

    #[test]
    fn timestamp_converts_to_utc() {
        let change = Change {
            id: "c1".to_string(),
            change_type: ChangeType::Insertion,
            text: "x".to_string(),
            author_id: "u1".to_string(),
            author_name: "Ada".to_string(),
            timestamp_ms: 1_700_000_000_000,
            source_path: vec![0, 0],
            resolution: Resolution::Pending,
        };
        assert_eq!(
            change.timestamp().map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let author = Author::new("u1", "Ada");
        let doc = DocNode::doc(vec![DocNode::paragraph(vec![
            DocNode::text("new").with_mark(Mark::insertion("c1", &author, 5)),
        ])]);
        let changes = extract_changes(&doc);
        let json = serde_json::to_value(&changes[0]).unwrap();
        assert_eq!(json["type"], "insertion");
        assert_eq!(json["authorName"], "Ada");
        assert_eq!(json["sourcePath"], serde_json::json!([0, 0]));
    }
}
