//! Marks and track-change metadata

use super::node::null_as_default;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Mark kind for canonical track-change marks
pub const TRACK_CHANGE: &str = "trackChange";
/// Mark kind the editor uses for styling; older documents also carry
/// `insertion` / `deletion` attributes on it
pub const TEXT_STYLE: &str = "textStyle";

const LEGACY_TRACK_ATTRS: [&str; 4] = ["insertion", "deletion", "changeId", "status"];

/// The user an edit is attributed to
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
}

impl Author {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Kind of tracked edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Insertion,
    Deletion,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insertion => "insertion",
            Self::Deletion => "deletion",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "insertion" => Some(Self::Insertion),
            "deletion" => Some(Self::Deletion),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision recorded on a track-change mark, applied by consolidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    fn from_attr(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("accepted") => Self::Accepted,
            Some("rejected") => Self::Rejected,
            _ => Self::Pending,
        }
    }
}

/// Track-change metadata read off a mark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackChange {
    pub change_id: String,
    pub change_type: ChangeType,
    pub author_id: String,
    pub author_name: String,
    pub timestamp_ms: i64,
    pub resolution: Resolution,
    /// Original text recorded by older deletion marks
    pub deleted_text: Option<String>,
}

impl TrackChange {
    /// True when resolving this change keeps its text in the document
    pub fn keeps_text(&self) -> Option<bool> {
        match (self.resolution, self.change_type) {
            (Resolution::Pending, _) => None,
            (Resolution::Accepted, ChangeType::Insertion)
            | (Resolution::Rejected, ChangeType::Deletion) => Some(true),
            (Resolution::Accepted, ChangeType::Deletion)
            | (Resolution::Rejected, ChangeType::Insertion) => Some(false),
        }
    }
}

/// How a mark participates in change tracking
#[derive(Debug, Clone, PartialEq)]
pub enum MarkClass {
    /// Well-formed track-change mark
    TrackChange(TrackChange),
    /// Claims to track a change but lacks an id or a single change type
    Malformed,
    /// Ordinary styling
    Style,
}

/// A decoration on a text run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Map::is_empty"
    )]
    pub attrs: Map<String, Value>,
}

impl Mark {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attrs: Map::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    /// A canonical track-change mark
    pub fn track(
        change_id: impl Into<String>,
        change_type: ChangeType,
        author: &Author,
        timestamp_ms: i64,
    ) -> Self {
        Self::new(TRACK_CHANGE)
            .with_attr("changeId", Value::String(change_id.into()))
            .with_attr("changeType", Value::from(change_type.as_str()))
            .with_attr("authorId", Value::String(author.id.clone()))
            .with_attr("authorName", Value::String(author.name.clone()))
            .with_attr("timestamp", Value::from(timestamp_ms))
    }

    pub fn insertion(change_id: impl Into<String>, author: &Author, timestamp_ms: i64) -> Self {
        Self::track(change_id, ChangeType::Insertion, author, timestamp_ms)
    }

    pub fn deletion(change_id: impl Into<String>, author: &Author, timestamp_ms: i64) -> Self {
        Self::track(change_id, ChangeType::Deletion, author, timestamp_ms)
    }

    /// A `textStyle` mark in the older editor encoding, where the change
    /// record is a JSON string under `insertion` or `deletion`.
    pub fn legacy(
        change_id: impl Into<String>,
        change_type: ChangeType,
        author: &Author,
        timestamp_ms: i64,
    ) -> Self {
        let record = json!({
            "userId": author.id,
            "userName": author.name,
            "timestamp": timestamp_ms,
        });
        Self::new(TEXT_STYLE)
            .with_attr(change_type.as_str(), Value::String(record.to_string()))
            .with_attr("changeId", Value::String(change_id.into()))
    }

    fn is_legacy_track(&self) -> bool {
        self.kind == TEXT_STYLE
            && ["insertion", "deletion"]
                .iter()
                .any(|key| self.attrs.get(*key).is_some_and(|v| !v.is_null()))
    }

    /// True if this mark claims to carry change tracking, well-formed or not
    pub fn is_tracking(&self) -> bool {
        self.kind == TRACK_CHANGE || self.is_legacy_track()
    }

    pub fn classify(&self) -> MarkClass {
        if self.kind == TRACK_CHANGE {
            return self.classify_canonical();
        }
        if self.is_legacy_track() {
            return self.classify_legacy();
        }
        MarkClass::Style
    }

    /// The track-change view of this mark, if well-formed
    pub fn track_change(&self) -> Option<TrackChange> {
        match self.classify() {
            MarkClass::TrackChange(tc) => Some(tc),
            _ => None,
        }
    }

    fn change_id(&self) -> Option<String> {
        self.attrs
            .get("changeId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }

    fn classify_canonical(&self) -> MarkClass {
        let Some(change_id) = self.change_id() else {
            return MarkClass::Malformed;
        };
        let Some(change_type) = self
            .attrs
            .get("changeType")
            .and_then(Value::as_str)
            .and_then(ChangeType::parse)
        else {
            return MarkClass::Malformed;
        };

        MarkClass::TrackChange(TrackChange {
            change_id,
            change_type,
            author_id: string_attr(&self.attrs, "authorId"),
            author_name: author_name(&self.attrs, "authorName"),
            timestamp_ms: timestamp_attr(self.attrs.get("timestamp")),
            resolution: Resolution::from_attr(self.attrs.get("status")),
            deleted_text: None,
        })
    }

    fn classify_legacy(&self) -> MarkClass {
        let insertion = self.attrs.get("insertion").filter(|v| !v.is_null());
        let deletion = self.attrs.get("deletion").filter(|v| !v.is_null());
        let (change_type, raw) = match (insertion, deletion) {
            (Some(raw), None) => (ChangeType::Insertion, raw),
            (None, Some(raw)) => (ChangeType::Deletion, raw),
            _ => return MarkClass::Malformed,
        };
        let Some(change_id) = self.change_id() else {
            return MarkClass::Malformed;
        };
        let record = match raw {
            Value::String(s) => match serde_json::from_str::<Map<String, Value>>(s) {
                Ok(map) => map,
                Err(_) => return MarkClass::Malformed,
            },
            Value::Object(map) => map.clone(),
            _ => return MarkClass::Malformed,
        };

        MarkClass::TrackChange(TrackChange {
            change_id,
            change_type,
            author_id: string_attr(&record, "userId"),
            author_name: author_name(&record, "userName"),
            timestamp_ms: timestamp_attr(record.get("timestamp")),
            resolution: Resolution::from_attr(self.attrs.get("status")),
            deleted_text: record
                .get("deletedText")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    /// Copy of this mark with its resolution set
    pub fn with_resolution(&self, resolution: Resolution) -> Mark {
        let mut mark = self.clone();
        match resolution {
            Resolution::Pending => {
                mark.attrs.remove("status");
            }
            _ => {
                mark.attrs
                    .insert("status".to_string(), Value::from(resolution.as_str()));
            }
        }
        mark
    }

    /// Remove the track-change decoration, keeping any styling
    ///
    /// Returns `None` when nothing but tracking was on the mark.
    pub fn strip_tracking(&self) -> Option<Mark> {
        if self.kind == TRACK_CHANGE {
            return None;
        }
        if !self.is_legacy_track() {
            return Some(self.clone());
        }
        let mut mark = self.clone();
        for key in LEGACY_TRACK_ATTRS {
            mark.attrs.remove(key);
        }
        if mark.attrs.values().all(Value::is_null) {
            None
        } else {
            Some(mark)
        }
    }
}

fn string_attr(attrs: &Map<String, Value>, key: &str) -> String {
    attrs
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn author_name(attrs: &Map<String, Value>, key: &str) -> String {
    attrs
        .get(key)
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

fn timestamp_attr(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        Some(Value::String(s)) => s.parse().unwrap_or_default(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> Author {
        Author::new("u1", "Ada")
    }

    #[test]
    fn canonical_mark_classifies_as_track_change() {
        let mark = Mark::insertion("c1", &author(), 1_700_000_000_000);
        let tc = mark.track_change().unwrap();
        assert_eq!(tc.change_id, "c1");
        assert_eq!(tc.change_type, ChangeType::Insertion);
        assert_eq!(tc.author_name, "Ada");
        assert_eq!(tc.timestamp_ms, 1_700_000_000_000);
        assert_eq!(tc.resolution, Resolution::Pending);
    }

    #[test]
    fn missing_change_type_is_malformed() {
        let mark = Mark::new(TRACK_CHANGE).with_attr("changeId", Value::from("c1"));
        assert_eq!(mark.classify(), MarkClass::Malformed);
    }

    #[test]
    fn empty_change_id_is_malformed() {
        let mark = Mark::new(TRACK_CHANGE)
            .with_attr("changeId", Value::from(""))
            .with_attr("changeType", Value::from("deletion"));
        assert_eq!(mark.classify(), MarkClass::Malformed);
    }

    #[test]
    fn legacy_text_style_mark_is_understood() {
        let mark = Mark::legacy("c2", ChangeType::Deletion, &author(), 42)
            .with_attr("color", Value::from("#ff0000"));
        let tc = mark.track_change().unwrap();
        assert_eq!(tc.change_type, ChangeType::Deletion);
        assert_eq!(tc.author_id, "u1");
        assert_eq!(tc.timestamp_ms, 42);

        let stripped = mark.strip_tracking().unwrap();
        assert_eq!(stripped.kind, TEXT_STYLE);
        assert_eq!(stripped.attrs.len(), 1);
        assert_eq!(stripped.attrs["color"], Value::from("#ff0000"));
    }

    #[test]
    fn legacy_mark_with_only_tracking_strips_entirely() {
        let mark = Mark::legacy("c2", ChangeType::Insertion, &author(), 42)
            .with_attr("deletion", Value::Null);
        assert!(mark.strip_tracking().is_none());
    }

    #[test]
    fn legacy_mark_with_unparseable_record_is_malformed() {
        let mark = Mark::new(TEXT_STYLE)
            .with_attr("insertion", Value::from("{not json"))
            .with_attr("changeId", Value::from("c3"));
        assert_eq!(mark.classify(), MarkClass::Malformed);
    }

    #[test]
    fn style_marks_are_not_tracking() {
        let bold = Mark::new("bold");
        assert_eq!(bold.classify(), MarkClass::Style);
        assert!(!bold.is_tracking());
        assert_eq!(bold.strip_tracking(), Some(bold));
    }

    #[test]
    fn resolution_round_trips_through_status_attr() {
        let mark = Mark::deletion("c1", &author(), 0).with_resolution(Resolution::Rejected);
        let tc = mark.track_change().unwrap();
        assert_eq!(tc.resolution, Resolution::Rejected);
        assert_eq!(tc.keeps_text(), Some(true));

        let pending = mark.with_resolution(Resolution::Pending);
        assert!(!pending.attrs.contains_key("status"));
    }
}
