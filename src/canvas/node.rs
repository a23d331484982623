//! Canvas node representation

use crate::document::null_as_default;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

/// Unique identifier for a canvas node
///
/// Serializes as a plain string (UUID or editor-generated id like "node-1712")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new random NodeId (UUID-based)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Diagram element kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Outline,
    Act,
    Chapter,
    SceneBeats,
    Character,
    WorldLocation,
    WorldObject,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outline => "Outline",
            Self::Act => "Act",
            Self::Chapter => "Chapter",
            Self::SceneBeats => "SceneBeats",
            Self::Character => "Character",
            Self::WorldLocation => "WorldLocation",
            Self::WorldObject => "WorldObject",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeStatus {
    Completed,
    #[default]
    #[serde(rename = "Not Completed")]
    NotCompleted,
}

/// Canvas coordinates of a node
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Lightweight reference to a character or world entity shown on a node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Relationship {
    pub with: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterGoal {
    pub goal: String,
    pub actions: Vec<String>,
    pub impact: String,
}

/// How an entity changes over the course of one act
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArcStep {
    pub act_id: String,
    pub timeline_event_id: String,
    pub description_change: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryEntry {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_note: Option<String>,
    pub date: String,
}

/// Attributes carried by `Character` nodes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CharacterAttrs {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backstory: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub beliefs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub motivations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub internal_conflicts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub external_conflicts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub goals: Vec<CharacterGoal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arc: Vec<ArcStep>,
}

/// Attributes carried by `WorldLocation` and `WorldObject` nodes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorldAttrs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub custom_attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules_and_beliefs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arc: Vec<ArcStep>,
}

/// Type-specific node attributes, selected by [`NodeType`]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodePayload {
    #[default]
    None,
    Character(CharacterAttrs),
    WorldLocation(WorldAttrs),
    WorldObject(WorldAttrs),
}

impl NodePayload {
    /// Empty payload matching a node type
    pub fn empty_for(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Character => Self::Character(CharacterAttrs::default()),
            NodeType::WorldLocation => Self::WorldLocation(WorldAttrs::default()),
            NodeType::WorldObject => Self::WorldObject(WorldAttrs::default()),
            _ => Self::None,
        }
    }

    /// True if this payload may sit on a node of the given type
    pub fn fits(&self, node_type: NodeType) -> bool {
        matches!(
            (self, node_type),
            (Self::None, _)
                | (Self::Character(_), NodeType::Character)
                | (Self::WorldLocation(_), NodeType::WorldLocation)
                | (Self::WorldObject(_), NodeType::WorldObject)
        )
    }

    fn from_details(node_type: NodeType, id: &NodeId, details: Map<String, Value>) -> Self {
        fn parse<T: Default + for<'de> Deserialize<'de>>(
            id: &NodeId,
            details: Map<String, Value>,
        ) -> T {
            serde_json::from_value(Value::Object(details)).unwrap_or_else(|e| {
                warn!(node = %id, error = %e, "unreadable node attributes; using defaults");
                T::default()
            })
        }

        match node_type {
            NodeType::Character => Self::Character(parse(id, details)),
            NodeType::WorldLocation => Self::WorldLocation(parse(id, details)),
            NodeType::WorldObject => Self::WorldObject(parse(id, details)),
            _ => Self::None,
        }
    }

    fn to_details(&self) -> Map<String, Value> {
        let value = match self {
            Self::None => return Map::new(),
            Self::Character(attrs) => serde_json::to_value(attrs),
            Self::WorldLocation(attrs) | Self::WorldObject(attrs) => serde_json::to_value(attrs),
        };
        match value {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// One diagram element in the plot/character/world graph
///
/// `parent_id` is a back-reference; the parent owns the relationship through
/// `child_ids`. `linked_node_ids` is symmetric across the two nodes.
/// [`CanvasGraph`](super::CanvasGraph) keeps both invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NodeRecord", into = "NodeRecord")]
pub struct CanvasNode {
    pub id: NodeId,
    pub node_type: NodeType,
    pub name: String,
    pub detail: String,
    pub goal: String,
    pub status: NodeStatus,
    pub timeline_event_ids: Vec<String>,
    pub parent_id: Option<NodeId>,
    pub child_ids: Vec<NodeId>,
    pub linked_node_ids: Vec<NodeId>,
    pub position: Option<Position>,
    pub characters: Vec<EntityRef>,
    pub worlds: Vec<EntityRef>,
    pub payload: NodePayload,
}

impl CanvasNode {
    /// Create a detached node with a generated id
    pub fn new(node_type: NodeType, name: impl Into<String>) -> Self {
        Self::with_id(NodeId::generate(), node_type, name)
    }

    pub fn with_id(id: impl Into<NodeId>, node_type: NodeType, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            name: name.into(),
            detail: String::new(),
            goal: String::new(),
            status: NodeStatus::default(),
            timeline_event_ids: Vec::new(),
            parent_id: None,
            child_ids: Vec::new(),
            linked_node_ids: Vec::new(),
            position: None,
            characters: Vec::new(),
            worlds: Vec::new(),
            payload: NodePayload::empty_for(node_type),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }

    pub fn with_payload(mut self, payload: NodePayload) -> Self {
        self.payload = payload;
        self
    }

    pub fn is_linked_to(&self, other: &NodeId) -> bool {
        self.linked_node_ids.contains(other)
    }

    pub fn has_child(&self, other: &NodeId) -> bool {
        self.child_ids.contains(other)
    }
}

/// Wire shape of a node: common fields plus type-specific attributes
/// flattened into the same object
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeRecord {
    id: NodeId,
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    detail: String,
    #[serde(default, deserialize_with = "null_as_default")]
    goal: String,
    #[serde(default)]
    status: NodeStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    timeline_event_ids: Vec<String>,
    #[serde(default)]
    parent_id: Option<NodeId>,
    #[serde(default, deserialize_with = "null_as_default")]
    child_ids: Vec<NodeId>,
    #[serde(default, deserialize_with = "null_as_default")]
    linked_node_ids: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    position: Option<Position>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    characters: Vec<EntityRef>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    worlds: Vec<EntityRef>,
    #[serde(flatten)]
    details: Map<String, Value>,
}

impl From<NodeRecord> for CanvasNode {
    fn from(record: NodeRecord) -> Self {
        let payload = NodePayload::from_details(record.node_type, &record.id, record.details);
        Self {
            id: record.id,
            node_type: record.node_type,
            name: record.name,
            detail: record.detail,
            goal: record.goal,
            status: record.status,
            timeline_event_ids: record.timeline_event_ids,
            parent_id: record.parent_id,
            child_ids: record.child_ids,
            linked_node_ids: record.linked_node_ids,
            position: record.position,
            characters: record.characters,
            worlds: record.worlds,
            payload,
        }
    }
}

impl From<CanvasNode> for NodeRecord {
    fn from(node: CanvasNode) -> Self {
        Self {
            details: node.payload.to_details(),
            id: node.id,
            node_type: node.node_type,
            name: node.name,
            detail: node.detail,
            goal: node.goal,
            status: node.status,
            timeline_event_ids: node.timeline_event_ids,
            parent_id: node.parent_id,
            child_ids: node.child_ids,
            linked_node_ids: node.linked_node_ids,
            position: node.position,
            characters: node.characters,
            worlds: node.worlds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_id_serializes_as_string() {
        let id = NodeId::from_string("node-1712");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"node-1712\"");
    }

    #[test]
    fn status_uses_display_names() {
        assert_eq!(
            serde_json::to_value(NodeStatus::NotCompleted).unwrap(),
            json!("Not Completed")
        );
        let done: NodeStatus = serde_json::from_value(json!("Completed")).unwrap();
        assert_eq!(done, NodeStatus::Completed);
    }

    #[test]
    fn minimal_record_defaults_missing_fields() {
        let node: CanvasNode = serde_json::from_value(json!({
            "id": "a1",
            "type": "Act",
            "name": "Act One",
            "linkedNodeIds": null
        }))
        .unwrap();

        assert_eq!(node.node_type, NodeType::Act);
        assert_eq!(node.status, NodeStatus::NotCompleted);
        assert!(node.child_ids.is_empty());
        assert!(node.linked_node_ids.is_empty());
        assert!(node.parent_id.is_none());
        assert_eq!(node.payload, NodePayload::None);
    }

    #[test]
    fn character_attributes_are_flattened() {
        let node: CanvasNode = serde_json::from_value(json!({
            "id": "c1",
            "type": "Character",
            "name": "Mira",
            "childIds": [],
            "linkedNodeIds": [],
            "position": { "x": 10.0, "y": 20.0 },
            "age": 31,
            "traits": ["stubborn", "loyal"],
            "goals": [{ "goal": "find her brother", "actions": [], "impact": "high" }]
        }))
        .unwrap();

        let NodePayload::Character(attrs) = &node.payload else {
            panic!("expected character payload");
        };
        assert_eq!(attrs.age, Some(31));
        assert_eq!(attrs.traits, vec!["stubborn", "loyal"]);
        assert_eq!(attrs.goals[0].goal, "find her brother");

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["age"], json!(31));
        assert_eq!(json["traits"], json!(["stubborn", "loyal"]));
        assert_eq!(json["type"], json!("Character"));
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn world_location_keeps_custom_attributes() {
        let node: CanvasNode = serde_json::from_value(json!({
            "id": "w1",
            "type": "WorldLocation",
            "name": "Harbor",
            "description": "Fog every morning",
            "customAttributes": { "population": 1200 },
            "history": [{ "event": "Great fire", "date": "1802" }]
        }))
        .unwrap();

        let NodePayload::WorldLocation(attrs) = &node.payload else {
            panic!("expected world location payload");
        };
        assert_eq!(attrs.description.as_deref(), Some("Fog every morning"));
        assert_eq!(attrs.custom_attributes["population"], json!(1200));
        assert_eq!(attrs.history[0].event, "Great fire");
    }

    #[test]
    fn payload_fits_only_matching_type() {
        let payload = NodePayload::Character(CharacterAttrs::default());
        assert!(payload.fits(NodeType::Character));
        assert!(!payload.fits(NodeType::WorldObject));
        assert!(NodePayload::None.fits(NodeType::Act));
    }
}
