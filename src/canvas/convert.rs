//! Edge conversion between parent-child, linked and deleted

use super::edge::{EdgeKey, EdgeKind};
use super::graph::{CanvasError, CanvasGraph, CanvasResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Requested conversion for an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeAction {
    Delete,
    ParentChild,
    Linked,
}

impl FromStr for EdgeAction {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delete" => Ok(Self::Delete),
            "parent-child" => Ok(Self::ParentChild),
            "linked" => Ok(Self::Linked),
            other => Err(CanvasError::Validation(format!("unknown edge action: {other}"))),
        }
    }
}

/// Current state of the relationship an edge id names
///
/// `Deleted` is terminal for that id: a conversion never brings it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeState {
    ParentChild,
    Linked,
    Deleted,
}

impl CanvasGraph {
    pub fn edge_state(&self, key: &EdgeKey) -> EdgeState {
        match key.kind {
            EdgeKind::ParentChild
                if self.is_parent_of(&key.source, &key.target)
                    && self
                        .node(&key.source)
                        .is_some_and(|p| p.has_child(&key.target)) =>
            {
                EdgeState::ParentChild
            }
            EdgeKind::Linked if self.is_linked(&key.source, &key.target) => EdgeState::Linked,
            _ => EdgeState::Deleted,
        }
    }

    /// Apply an edge conversion and return the resulting relationship state
    ///
    /// - `Delete` removes the relationship; deleting an absent edge is a no-op.
    /// - `ParentChild` turns a link into parent (source) and child (target).
    ///   Rejected with [`CanvasError::GraphCycle`] if the source already
    ///   descends from the target.
    /// - `Linked` turns a parent-child edge into a symmetric link.
    ///
    /// Converting an edge to its current kind changes nothing. Converting an
    /// edge that no longer exists is [`CanvasError::EdgeNotFound`].
    pub fn convert_edge(&mut self, edge_id: &str, action: EdgeAction) -> CanvasResult<EdgeState> {
        let key = self.edge_key(edge_id)?;
        let state = self.edge_state(&key);

        let result = match (action, state) {
            (EdgeAction::Delete, EdgeState::Deleted) => return Ok(EdgeState::Deleted),
            (EdgeAction::ParentChild, EdgeState::ParentChild)
            | (EdgeAction::Linked, EdgeState::Linked) => return Ok(state),
            (_, EdgeState::Deleted) => return Err(CanvasError::EdgeNotFound(edge_id.to_string())),

            (EdgeAction::Delete, EdgeState::ParentChild) => {
                self.unparent(&key.source, &key.target);
                EdgeState::Deleted
            }
            (EdgeAction::Delete, EdgeState::Linked) => {
                self.unlink(&key.source, &key.target);
                EdgeState::Deleted
            }
            (EdgeAction::ParentChild, EdgeState::Linked) => {
                if self.is_ancestor(&key.target, &key.source) {
                    return Err(CanvasError::GraphCycle {
                        parent: key.source,
                        child: key.target,
                    });
                }
                self.unlink(&key.source, &key.target);
                self.set_parent(&key.target, &key.source);
                EdgeState::ParentChild
            }
            (EdgeAction::Linked, EdgeState::ParentChild) => {
                self.unparent(&key.source, &key.target);
                self.link(&key.source, &key.target);
                EdgeState::Linked
            }
        };

        debug!(edge = %edge_id, ?action, ?result, "converted edge");
        self.touch();
        Ok(result)
    }
}
