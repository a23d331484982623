//! Persisted canvas snapshot

use super::node::{CanvasNode, NodeId, Position};
use crate::document::null_as_default;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Kind of story moment a timeline event marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineEventType {
    #[default]
    Story,
    Character,
    Flashback,
    World,
}

/// Event date: either an in-story ordinal or free text ("Spring, 1802")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimelineDate {
    Ordinal(i64),
    Text(String),
}

impl Default for TimelineDate {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    pub name: String,
    pub date: TimelineDate,
    #[serde(rename = "type")]
    pub event_type: TimelineEventType,
    #[serde(deserialize_with = "null_as_default")]
    pub linked_node_ids: Vec<NodeId>,
    pub description: String,
}

/// Canvas snapshot as stored per (book, version)
///
/// `node_positions` duplicates `nodes[].position`; on load the map wins and
/// on save it is rebuilt from the nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<CanvasNode>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timeline_events: Vec<TimelineEvent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub node_positions: BTreeMap<NodeId, Position>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_updated: DateTime<Utc>,
}

impl Default for CanvasData {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            timeline_events: Vec::new(),
            node_positions: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

impl CanvasData {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Unparseable or empty timestamps fall back to the epoch
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default())
}
