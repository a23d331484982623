//! View filtering: which nodes and edges a canvas screen shows

use super::edge::CanvasEdge;
use super::graph::CanvasGraph;
use super::node::{CanvasNode, NodeId, NodeType};
use std::collections::HashSet;

/// Node types shown on the root view of the plot canvas
pub const PLOT_TYPES: &[NodeType] = &[
    NodeType::Outline,
    NodeType::Act,
    NodeType::Chapter,
    NodeType::SceneBeats,
];

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasView {
    /// Top-level nodes, optionally restricted to some node types
    Root { types: Option<Vec<NodeType>> },
    /// One node with its children and linked nodes
    Focus(NodeId),
}

impl CanvasView {
    pub fn root() -> Self {
        Self::Root { types: None }
    }

    pub fn plot() -> Self {
        Self::Root {
            types: Some(PLOT_TYPES.to_vec()),
        }
    }
}

impl CanvasGraph {
    /// Nodes visible in a view, in display order
    ///
    /// A focus view on a missing node is empty.
    pub fn visible_nodes(&self, view: &CanvasView) -> Vec<&CanvasNode> {
        match view {
            CanvasView::Root { types } => self
                .nodes()
                .iter()
                .filter(|n| n.parent_id.is_none())
                .filter(|n| types.as_ref().map_or(true, |t| t.contains(&n.node_type)))
                .collect(),
            CanvasView::Focus(id) => {
                let Some(focus) = self.node(id) else {
                    return Vec::new();
                };
                let mut seen = HashSet::new();
                seen.insert(&focus.id);
                let mut out = vec![focus];
                for other in focus.child_ids.iter().chain(&focus.linked_node_ids) {
                    if let Some(node) = self.node(other) {
                        if seen.insert(&node.id) {
                            out.push(node);
                        }
                    }
                }
                out
            }
        }
    }

    /// Edges whose endpoints are both visible in the view
    pub fn derive_edges_in(&self, view: &CanvasView) -> Vec<CanvasEdge> {
        let visible: HashSet<&NodeId> = self.visible_nodes(view).into_iter().map(|n| &n.id).collect();
        self.derive_edges_where(|id| visible.contains(id))
    }
}
