//! Derived edges and edge identity
//!
//! Edges are not stored. They are derived from `child_ids` (parent-child) and
//! `linked_node_ids` (linked) and identified by string ids of the form
//! `parent_{parentId}_{childId}` and `link_{idA}_{idB}`.

use super::graph::{CanvasError, CanvasGraph, CanvasResult};
use super::handles::{best_handles, Handle};
use super::node::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const PARENT_PREFIX: &str = "parent_";
const LINK_PREFIX: &str = "link_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    ParentChild,
    Linked,
}

/// Parsed edge identity
///
/// For parent-child edges `source` is the parent and `target` the child.
/// Linked edges are undirected: use [`same_edge`](Self::same_edge) or
/// [`canonical`](Self::canonical) to compare them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub kind: EdgeKind,
    pub source: NodeId,
    pub target: NodeId,
}

impl EdgeKey {
    pub fn parent_child(parent: impl Into<NodeId>, child: impl Into<NodeId>) -> Self {
        Self {
            kind: EdgeKind::ParentChild,
            source: parent.into(),
            target: child.into(),
        }
    }

    pub fn linked(a: impl Into<NodeId>, b: impl Into<NodeId>) -> Self {
        Self {
            kind: EdgeKind::Linked,
            source: a.into(),
            target: b.into(),
        }
    }

    pub fn id(&self) -> String {
        let prefix = match self.kind {
            EdgeKind::ParentChild => PARENT_PREFIX,
            EdgeKind::Linked => LINK_PREFIX,
        };
        format!("{prefix}{}_{}", self.source, self.target)
    }

    /// Linked keys with endpoints in sorted order; parent-child keys unchanged
    pub fn canonical(&self) -> Self {
        if self.kind == EdgeKind::Linked && self.target < self.source {
            Self::linked(self.target.clone(), self.source.clone())
        } else {
            self.clone()
        }
    }

    /// True if both keys name the same logical edge
    pub fn same_edge(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }

    /// Parse an edge id, splitting the endpoints at the first underscore
    pub fn parse(raw: &str) -> CanvasResult<Self> {
        Self::parse_with(raw, |_| true)
    }

    /// Parse an edge id whose node ids may themselves contain underscores
    ///
    /// The first split point where `exists` accepts both halves wins; if no
    /// split satisfies it, the first underscore is used.
    pub fn parse_with(raw: &str, exists: impl Fn(&str) -> bool) -> CanvasResult<Self> {
        let (kind, rest) = if let Some(rest) = raw.strip_prefix(PARENT_PREFIX) {
            (EdgeKind::ParentChild, rest)
        } else if let Some(rest) = raw.strip_prefix(LINK_PREFIX) {
            (EdgeKind::Linked, rest)
        } else {
            return Err(CanvasError::InvalidEdgeId(raw.to_string()));
        };

        let splits: Vec<(&str, &str)> = rest
            .match_indices('_')
            .map(|(i, _)| (&rest[..i], &rest[i + 1..]))
            .filter(|(a, b)| !a.is_empty() && !b.is_empty())
            .collect();
        let (a, b) = splits
            .iter()
            .find(|(a, b)| exists(a) && exists(b))
            .or_else(|| splits.first())
            .copied()
            .ok_or_else(|| CanvasError::InvalidEdgeId(raw.to_string()))?;

        Ok(Self {
            kind,
            source: NodeId::from(a),
            target: NodeId::from(b),
        })
    }
}

impl std::fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id())
    }
}

/// A renderable edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasEdge {
    pub id: String,
    pub kind: EdgeKind,
    pub source: NodeId,
    pub target: NodeId,
    pub source_handle: Handle,
    pub target_handle: Handle,
}

impl CanvasEdge {
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            kind: self.kind,
            source: self.source.clone(),
            target: self.target.clone(),
        }
    }
}

impl CanvasGraph {
    /// Resolve an edge id against the nodes of this graph
    pub fn edge_key(&self, raw: &str) -> CanvasResult<EdgeKey> {
        EdgeKey::parse_with(raw, |id| self.contains(id))
    }

    /// Derive the full edge list, one edge per logical relationship
    pub fn derive_edges(&self) -> Vec<CanvasEdge> {
        self.derive_edges_where(|_| true)
    }

    /// Derive edges whose endpoints both satisfy `visible`
    pub(crate) fn derive_edges_where(&self, visible: impl Fn(&NodeId) -> bool) -> Vec<CanvasEdge> {
        let mut edges = Vec::new();
        let mut seen_links = HashSet::new();

        for node in self.nodes().iter().filter(|n| visible(&n.id)) {
            for child in node.child_ids.iter().filter(|c| visible(c)) {
                if !self.is_parent_of(&node.id, child) {
                    continue;
                }
                let key = EdgeKey::parent_child(node.id.clone(), child.clone());
                edges.push(CanvasEdge {
                    id: key.id(),
                    kind: EdgeKind::ParentChild,
                    source: key.source,
                    target: key.target,
                    source_handle: Handle::Bottom,
                    target_handle: Handle::Top,
                });
            }

            for other_id in node.linked_node_ids.iter().filter(|l| visible(l)) {
                let Some(other) = self.node(other_id) else {
                    continue;
                };
                let key = EdgeKey::linked(node.id.clone(), other_id.clone());
                if !seen_links.insert(key.canonical()) {
                    continue;
                }
                let (source_handle, target_handle) = best_handles(
                    node.position.unwrap_or_default(),
                    other.position.unwrap_or_default(),
                );
                edges.push(CanvasEdge {
                    id: key.id(),
                    kind: EdgeKind::Linked,
                    source: key.source,
                    target: key.target,
                    source_handle,
                    target_handle,
                });
            }
        }
        edges
    }
}
