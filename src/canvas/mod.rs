//! Canvas Graph Model: plot, character and world diagrams
//!
//! Nodes own their relationships: `child_ids`/`parent_id` form a tree along
//! the parent axis, `linked_node_ids` form an undirected graph. Edges are
//! derived from those lists on demand and converted in place.

mod convert;
mod data;
mod edge;
mod graph;
mod handles;
mod node;
mod view;


pub use convert::{EdgeAction, EdgeState};
pub use data::{CanvasData, TimelineDate, TimelineEvent, TimelineEventType};
pub use edge::{CanvasEdge, EdgeKey, EdgeKind};
pub use graph::{CanvasError, CanvasGraph, CanvasResult, NodeEdit, Violation};
pub use handles::{best_handles, Handle};
pub use node::{
    ArcStep, CanvasNode, CharacterAttrs, CharacterGoal, EntityRef, HistoryEntry, NodeId,
    NodePayload, NodeStatus, NodeType, Position, Relationship, WorldAttrs,
};
pub use view::{CanvasView, PLOT_TYPES};
