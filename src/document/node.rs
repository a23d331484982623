//! Document tree nodes

use super::mark::Mark;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Child-index path from the root to a node
pub type NodePath = Vec<usize>;

/// Node kind as named by the editor schema
///
/// Unknown kinds round-trip unchanged through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Doc,
    Text,
    Paragraph,
    Heading,
    Blockquote,
    Image,
    HardBreak,
    Other(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Doc => "doc",
            Self::Text => "text",
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::Blockquote => "blockquote",
            Self::Image => "image",
            Self::HardBreak => "hardBreak",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for NodeKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "doc" => Self::Doc,
            "text" => Self::Text,
            "paragraph" => Self::Paragraph,
            "heading" => Self::Heading,
            "blockquote" => Self::Blockquote,
            "image" => Self::Image,
            "hardBreak" => Self::HardBreak,
            _ => Self::Other(s),
        }
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Other(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Treats an explicit JSON `null` as the type's default.
///
/// The editor emits `"attrs": null` and `"marks": null` in places.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A node in the chapter document tree
///
/// A `text` node is a leaf: it has `text` and may have marks, never children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(
        rename = "attrs",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Map::is_empty"
    )]
    pub attributes: Map<String, Value>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub marks: Vec<Mark>,
    #[serde(
        rename = "content",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<DocNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl DocNode {
    /// Create an empty node of the given kind
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attributes: Map::new(),
            marks: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// The root `doc` node
    pub fn doc(children: Vec<DocNode>) -> Self {
        Self::new(NodeKind::Doc).with_children(children)
    }

    pub fn paragraph(children: Vec<DocNode>) -> Self {
        Self::new(NodeKind::Paragraph).with_children(children)
    }

    pub fn heading(level: u8, children: Vec<DocNode>) -> Self {
        Self::new(NodeKind::Heading)
            .with_attr("level", Value::from(level))
            .with_children(children)
    }

    /// A text leaf
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(NodeKind::Text)
        }
    }

    pub fn with_children(mut self, children: Vec<DocNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_mark(mut self, mark: Mark) -> Self {
        self.marks.push(mark);
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    /// Text of a leaf, empty for non-text nodes
    pub fn text_content(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// All text leaves concatenated in document order
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if self.is_text() {
            out.push_str(self.text_content());
            return;
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Follow a child-index path from this node
    pub fn node_at(&self, path: &[usize]) -> Option<&DocNode> {
        let mut current = self;
        for &index in path {
            current = current.children.get(index)?;
        }
        Some(current)
    }

    /// True if any text leaf carries a well-formed track-change mark
    pub fn has_track_changes(&self) -> bool {
        if self.is_text() {
            return self.marks.iter().any(|m| m.track_change().is_some());
        }
        self.children.iter().any(DocNode::has_track_changes)
    }

    /// Path of the first text leaf carrying the given change id
    pub fn find_change(&self, change_id: &str) -> Option<NodePath> {
        let mut path = Vec::new();
        if self.find_change_inner(change_id, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn find_change_inner(&self, change_id: &str, path: &mut NodePath) -> bool {
        if self.is_text() {
            return self
                .marks
                .iter()
                .filter_map(Mark::track_change)
                .any(|tc| tc.change_id == change_id);
        }
        for (index, child) in self.children.iter().enumerate() {
            path.push(index);
            if child.find_change_inner(change_id, path) {
                return true;
            }
            path.pop();
        }
        false
    }
}
