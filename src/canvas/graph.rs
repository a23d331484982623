//! CanvasGraph: the in-memory plot/character/world graph

use super::data::{CanvasData, TimelineEvent};
use super::node::{CanvasNode, NodeId, NodeStatus, Position};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur in canvas graph operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanvasError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("Cannot connect node {0} to itself")]
    SelfLoop(NodeId),

    #[error("Making {child} a child of {parent} would create a parent cycle")]
    GraphCycle { parent: NodeId, child: NodeId },

    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    #[error("Invalid edge id: {0}")]
    InvalidEdgeId(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type CanvasResult<T> = Result<T, CanvasError>;

/// A violated graph invariant, as reported by [`CanvasGraph::check_invariants`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    DuplicateId(NodeId),
    SelfReference(NodeId),
    Dangling { node: NodeId, missing: NodeId },
    ParentChildMismatch { parent: NodeId, child: NodeId },
    AsymmetricLink { from: NodeId, to: NodeId },
    ParentCycle(NodeId),
    DanglingTimelineLink { event: String, missing: NodeId },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "duplicate node id {id}"),
            Self::SelfReference(id) => write!(f, "node {id} references itself"),
            Self::Dangling { node, missing } => {
                write!(f, "node {node} references missing node {missing}")
            }
            Self::ParentChildMismatch { parent, child } => {
                write!(f, "parentId/childIds disagree between {parent} and {child}")
            }
            Self::AsymmetricLink { from, to } => {
                write!(f, "{from} links to {to} but not the reverse")
            }
            Self::ParentCycle(id) => write!(f, "node {id} is on a parent cycle"),
            Self::DanglingTimelineLink { event, missing } => {
                write!(f, "timeline event {event} references missing node {missing}")
            }
        }
    }
}

/// Editable scalar fields of a node; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct NodeEdit {
    pub name: Option<String>,
    pub detail: Option<String>,
    pub goal: Option<String>,
    pub status: Option<NodeStatus>,
}

const CHILD_OFFSET: f64 = 200.0;
const SIBLING_SPACING: f64 = 220.0;
const GRID_COLUMNS: usize = 5;
const GRID_SPACING_X: f64 = 250.0;
const GRID_SPACING_Y: f64 = 200.0;

/// The canvas graph for one book version
///
/// Every mutating operation keeps the parent/child inverse invariant, link
/// symmetry and an acyclic parent chain. Nodes keep insertion order.
#[derive(Debug, Clone)]
pub struct CanvasGraph {
    nodes: Vec<CanvasNode>,
    timeline_events: Vec<TimelineEvent>,
    last_updated: DateTime<Utc>,
}

impl Default for CanvasGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            timeline_events: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    /// Build a graph from a persisted snapshot, repairing what is inconsistent
    pub fn from_data(data: CanvasData) -> Self {
        let CanvasData {
            nodes,
            timeline_events,
            node_positions,
            last_updated,
        } = data;

        let mut graph = Self {
            nodes: Vec::with_capacity(nodes.len()),
            timeline_events,
            last_updated,
        };
        let mut seen = HashSet::new();
        for mut node in nodes {
            if !seen.insert(node.id.clone()) {
                warn!(node = %node.id, "dropping node with duplicate id");
                continue;
            }
            if let Some(pos) = node_positions.get(&node.id) {
                node.position = Some(*pos);
            }
            graph.nodes.push(node);
        }

        graph.repair();
        graph.place_unpositioned();
        graph
    }

    /// Invariant violations in a snapshot as stored, before any repair
    ///
    /// [`from_data`](Self::from_data) fixes everything reported here.
    pub fn inspect(data: &CanvasData) -> Vec<Violation> {
        let graph = Self {
            nodes: data.nodes.clone(),
            timeline_events: data.timeline_events.clone(),
            last_updated: data.last_updated,
        };
        graph.check_invariants()
    }

    /// Snapshot for persistence; `nodePositions` is rebuilt from the nodes
    pub fn to_data(&self) -> CanvasData {
        let node_positions = self
            .nodes
            .iter()
            .filter_map(|n| n.position.map(|p| (n.id.clone(), p)))
            .collect();
        CanvasData {
            nodes: self.nodes.clone(),
            timeline_events: self.timeline_events.clone(),
            node_positions,
            last_updated: self.last_updated,
        }
    }

    pub fn nodes(&self) -> &[CanvasNode] {
        &self.nodes
    }

    pub fn node(&self, id: &NodeId) -> Option<&CanvasNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id.as_str() == id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn timeline_events(&self) -> &[TimelineEvent] {
        &self.timeline_events
    }

    pub fn add_timeline_event(&mut self, event: TimelineEvent) {
        self.timeline_events.push(event);
        self.touch();
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn children_of(&self, id: &NodeId) -> Vec<&CanvasNode> {
        self.node(id)
            .map(|n| n.child_ids.iter().filter_map(|c| self.node(c)).collect())
            .unwrap_or_default()
    }

    /// Add a node; relationships other than `parent_id` are established
    /// afterwards through [`on_connect`](Self::on_connect) and
    /// [`assign_parent`](Self::assign_parent)
    pub fn add_node(&mut self, mut node: CanvasNode) -> CanvasResult<NodeId> {
        if node.name.trim().is_empty() {
            return Err(CanvasError::Validation("node name must not be empty".into()));
        }
        if self.contains(node.id.as_str()) {
            return Err(CanvasError::DuplicateNode(node.id));
        }
        if let Some(parent) = &node.parent_id {
            if !self.contains(parent.as_str()) {
                return Err(CanvasError::NodeNotFound(parent.clone()));
            }
        }
        if !node.payload.fits(node.node_type) {
            return Err(CanvasError::Validation(format!(
                "attributes do not match node type {}",
                node.node_type
            )));
        }

        node.child_ids.clear();
        node.linked_node_ids.clear();
        if node.position.is_none() {
            node.position = Some(self.auto_position(node.parent_id.as_ref()));
        }

        let id = node.id.clone();
        if let Some(parent) = node.parent_id.clone() {
            if let Some(p) = self.node_mut(&parent) {
                p.child_ids.push(id.clone());
            }
        }
        debug!(node = %id, node_type = %node.node_type, "added canvas node");
        self.nodes.push(node);
        self.touch();
        Ok(id)
    }

    pub fn add_child(&mut self, parent: &NodeId, mut node: CanvasNode) -> CanvasResult<NodeId> {
        node.parent_id = Some(parent.clone());
        self.add_node(node)
    }

    pub fn update_node(&mut self, id: &NodeId, edit: NodeEdit) -> CanvasResult<()> {
        if let Some(name) = &edit.name {
            if name.trim().is_empty() {
                return Err(CanvasError::Validation("node name must not be empty".into()));
            }
        }
        let node = self
            .node_mut(id)
            .ok_or_else(|| CanvasError::NodeNotFound(id.clone()))?;

        if let Some(name) = edit.name {
            node.name = name;
        }
        if let Some(detail) = edit.detail {
            node.detail = detail;
        }
        if let Some(goal) = edit.goal {
            node.goal = goal;
        }
        if let Some(status) = edit.status {
            node.status = status;
        }
        self.touch();
        Ok(())
    }

    pub fn set_position(&mut self, id: &NodeId, position: Position) -> CanvasResult<()> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| CanvasError::NodeNotFound(id.clone()))?;
        node.position = Some(position);
        self.touch();
        Ok(())
    }

    /// Remove a node and sweep every reference to it
    ///
    /// Children of the removed node become top-level nodes.
    pub fn remove_node(&mut self, id: &NodeId) -> CanvasResult<CanvasNode> {
        let index = self
            .index_of(id)
            .ok_or_else(|| CanvasError::NodeNotFound(id.clone()))?;
        let removed = self.nodes.remove(index);

        for node in &mut self.nodes {
            node.child_ids.retain(|c| c != id);
            node.linked_node_ids.retain(|l| l != id);
            if node.parent_id.as_ref() == Some(id) {
                node.parent_id = None;
            }
        }
        for event in &mut self.timeline_events {
            event.linked_node_ids.retain(|l| l != id);
        }

        debug!(node = %id, "removed canvas node");
        self.touch();
        Ok(removed)
    }

    /// Add a symmetric link between two existing nodes
    ///
    /// Returns `false` when the link already existed.
    pub fn on_connect(&mut self, source: &NodeId, target: &NodeId) -> CanvasResult<bool> {
        if source == target {
            return Err(CanvasError::SelfLoop(source.clone()));
        }
        self.require(source)?;
        self.require(target)?;

        if self.is_linked(source, target) {
            return Ok(false);
        }
        self.link(source, target);
        debug!(%source, %target, "linked nodes");
        self.touch();
        Ok(true)
    }

    /// Make `child` a child of `parent`, detaching it from any previous parent
    pub fn assign_parent(&mut self, child: &NodeId, parent: &NodeId) -> CanvasResult<()> {
        if child == parent {
            return Err(CanvasError::SelfLoop(child.clone()));
        }
        self.require(child)?;
        self.require(parent)?;
        if self.is_ancestor(child, parent) {
            return Err(CanvasError::GraphCycle {
                parent: parent.clone(),
                child: child.clone(),
            });
        }

        self.set_parent(child, parent);
        debug!(%parent, %child, "assigned parent");
        self.touch();
        Ok(())
    }

    /// Clear a node's parent; returns `false` if it had none
    pub fn detach_parent(&mut self, child: &NodeId) -> CanvasResult<bool> {
        let parent = self
            .node(child)
            .ok_or_else(|| CanvasError::NodeNotFound(child.clone()))?
            .parent_id
            .clone();
        let Some(parent) = parent else {
            return Ok(false);
        };
        self.unparent(&parent, child);
        self.touch();
        Ok(true)
    }

    /// True if `ancestor` appears on the parent chain of `node`
    pub fn is_ancestor(&self, ancestor: &NodeId, node: &NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut current = self.node(node).and_then(|n| n.parent_id.as_ref());
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            if !visited.insert(id) {
                return false;
            }
            current = self.node(id).and_then(|n| n.parent_id.as_ref());
        }
        false
    }

    pub fn is_linked(&self, a: &NodeId, b: &NodeId) -> bool {
        self.node(a).is_some_and(|n| n.is_linked_to(b))
    }

    pub fn is_parent_of(&self, parent: &NodeId, child: &NodeId) -> bool {
        self.node(child)
            .is_some_and(|c| c.parent_id.as_ref() == Some(parent))
    }

    /// Report every violation of the graph invariants
    pub fn check_invariants(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut seen = HashSet::new();

        for node in &self.nodes {
            if !seen.insert(&node.id) {
                violations.push(Violation::DuplicateId(node.id.clone()));
            }
            let refs = node
                .parent_id
                .iter()
                .chain(&node.child_ids)
                .chain(&node.linked_node_ids);
            for other in refs {
                if other == &node.id {
                    violations.push(Violation::SelfReference(node.id.clone()));
                } else if !self.contains(other.as_str()) {
                    violations.push(Violation::Dangling {
                        node: node.id.clone(),
                        missing: other.clone(),
                    });
                }
            }

            if let Some(parent) = self.parent_of(node) {
                if !parent.has_child(&node.id) {
                    violations.push(Violation::ParentChildMismatch {
                        parent: parent.id.clone(),
                        child: node.id.clone(),
                    });
                }
            }
            for child in node.child_ids.iter().filter_map(|c| self.node(c)) {
                if child.parent_id.as_ref() != Some(&node.id) {
                    violations.push(Violation::ParentChildMismatch {
                        parent: node.id.clone(),
                        child: child.id.clone(),
                    });
                }
            }
            for other in node.linked_node_ids.iter().filter_map(|l| self.node(l)) {
                if !other.is_linked_to(&node.id) {
                    violations.push(Violation::AsymmetricLink {
                        from: node.id.clone(),
                        to: other.id.clone(),
                    });
                }
            }
            if node.parent_id.is_some() && self.is_ancestor(&node.id, &node.id) {
                violations.push(Violation::ParentCycle(node.id.clone()));
            }
        }
        for event in &self.timeline_events {
            for missing in event.linked_node_ids.iter().filter(|l| !self.contains(l.as_str())) {
                violations.push(Violation::DanglingTimelineLink {
                    event: event.id.clone(),
                    missing: missing.clone(),
                });
            }
        }
        violations
    }

    // -- internal mutation helpers --

    pub(crate) fn node_mut(&mut self, id: &NodeId) -> Option<&mut CanvasNode> {
        self.nodes.iter_mut().find(|n| &n.id == id)
    }

    fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| &n.id == id)
    }

    pub(crate) fn require(&self, id: &NodeId) -> CanvasResult<()> {
        if self.contains(id.as_str()) {
            Ok(())
        } else {
            Err(CanvasError::NodeNotFound(id.clone()))
        }
    }

    fn parent_of(&self, node: &CanvasNode) -> Option<&CanvasNode> {
        node.parent_id.as_ref().and_then(|p| self.node(p))
    }

    pub(crate) fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    pub(crate) fn link(&mut self, a: &NodeId, b: &NodeId) {
        if let Some(node) = self.node_mut(a) {
            if !node.linked_node_ids.contains(b) {
                node.linked_node_ids.push(b.clone());
            }
        }
        if let Some(node) = self.node_mut(b) {
            if !node.linked_node_ids.contains(a) {
                node.linked_node_ids.push(a.clone());
            }
        }
    }

    pub(crate) fn unlink(&mut self, a: &NodeId, b: &NodeId) {
        if let Some(node) = self.node_mut(a) {
            node.linked_node_ids.retain(|l| l != b);
        }
        if let Some(node) = self.node_mut(b) {
            node.linked_node_ids.retain(|l| l != a);
        }
    }

    /// Remove the parent/child relationship between the two nodes, in both directions
    pub(crate) fn unparent(&mut self, parent: &NodeId, child: &NodeId) {
        if let Some(p) = self.node_mut(parent) {
            p.child_ids.retain(|c| c != child);
        }
        if let Some(c) = self.node_mut(child) {
            if c.parent_id.as_ref() == Some(parent) {
                c.parent_id = None;
            }
        }
    }

    /// Point `child` at `parent`; callers check for cycles first
    pub(crate) fn set_parent(&mut self, child: &NodeId, parent: &NodeId) {
        let previous = self.node(child).and_then(|c| c.parent_id.clone());
        if let Some(previous) = previous.filter(|p| p != parent) {
            self.unparent(&previous, child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent_id = Some(parent.clone());
        }
        if let Some(p) = self.node_mut(parent) {
            if !p.child_ids.contains(child) {
                p.child_ids.push(child.clone());
            }
        }
    }

    fn auto_position(&self, parent: Option<&NodeId>) -> Position {
        match parent.and_then(|p| self.node(p)) {
            Some(parent) => {
                let origin = parent.position.unwrap_or_default();
                let siblings = parent.child_ids.len() as f64;
                origin.offset(CHILD_OFFSET + siblings * SIBLING_SPACING, CHILD_OFFSET)
            }
            None => {
                let slot = self.nodes.iter().filter(|n| n.parent_id.is_none()).count();
                Position::new(
                    (slot % GRID_COLUMNS) as f64 * GRID_SPACING_X,
                    (slot / GRID_COLUMNS) as f64 * GRID_SPACING_Y,
                )
            }
        }
    }

    /// Auto-place nodes loaded without a position, parents before children
    fn place_unpositioned(&mut self) {
        let mut pending: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.position.is_none())
            .map(|n| n.id.clone())
            .collect();
        if pending.is_empty() {
            return;
        }
        debug!(count = pending.len(), "auto-placing nodes without a position");

        while !pending.is_empty() {
            let before = pending.len();
            pending.retain(|id| {
                let parent = self.node(id).and_then(|n| n.parent_id.clone());
                let parent_placed = parent
                    .as_ref()
                    .and_then(|p| self.node(p))
                    .map_or(true, |p| p.position.is_some());
                if !parent_placed {
                    return true;
                }
                let position = match &parent {
                    Some(p) => {
                        let origin = self.node(p).and_then(|n| n.position).unwrap_or_default();
                        let rank = self
                            .node(p)
                            .and_then(|n| n.child_ids.iter().position(|c| c == id))
                            .unwrap_or(0) as f64;
                        origin.offset(CHILD_OFFSET + rank * SIBLING_SPACING, CHILD_OFFSET)
                    }
                    None => self.auto_position(None),
                };
                if let Some(node) = self.node_mut(id) {
                    node.position = Some(position);
                }
                false
            });
            if pending.len() == before {
                // Only reachable if parents are unplaceable; fall back to the grid
                for id in pending.drain(..) {
                    let position = self.auto_position(None);
                    if let Some(node) = self.node_mut(&id) {
                        node.position = Some(position);
                    }
                }
            }
        }
    }

    /// Restore the graph invariants on loaded data
    fn repair(&mut self) {
        let ids: HashSet<NodeId> = self.nodes.iter().map(|n| n.id.clone()).collect();

        // Dangling, self and duplicate references
        for node in &mut self.nodes {
            let id = node.id.clone();
            if let Some(parent) = &node.parent_id {
                if parent == &id || !ids.contains(parent) {
                    warn!(node = %id, parent = %parent, "dropping invalid parent reference");
                    node.parent_id = None;
                }
            }
            for (field, list) in [
                ("childIds", &mut node.child_ids),
                ("linkedNodeIds", &mut node.linked_node_ids),
            ] {
                let mut unique = HashSet::new();
                let before = list.len();
                list.retain(|other| other != &id && ids.contains(other) && unique.insert(other.clone()));
                if list.len() != before {
                    warn!(node = %id, field, dropped = before - list.len(), "dropping invalid references");
                }
            }
        }

        for event in &mut self.timeline_events {
            let before = event.linked_node_ids.len();
            event.linked_node_ids.retain(|l| ids.contains(l));
            if event.linked_node_ids.len() != before {
                warn!(
                    event = %event.id,
                    dropped = before - event.linked_node_ids.len(),
                    "dropping timeline links to missing nodes"
                );
            }
        }

        // parentId is authoritative; unclaimed childIds entries adopt the node
        let index: HashMap<NodeId, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        for p in 0..self.nodes.len() {
            let parent_id = self.nodes[p].id.clone();
            let claimed = std::mem::take(&mut self.nodes[p].child_ids);
            let mut kept = Vec::with_capacity(claimed.len());
            for child_id in claimed {
                let Some(&c) = index.get(&child_id) else {
                    continue;
                };
                match &self.nodes[c].parent_id {
                    Some(actual) if actual == &parent_id => kept.push(child_id),
                    Some(actual) => {
                        warn!(parent = %parent_id, child = %child_id, actual = %actual,
                            "dropping childIds entry contradicted by parentId");
                    }
                    None => {
                        warn!(parent = %parent_id, child = %child_id, "adopting child listed without parentId");
                        self.nodes[c].parent_id = Some(parent_id.clone());
                        kept.push(child_id);
                    }
                }
            }
            self.nodes[p].child_ids = kept;
        }
        for c in 0..self.nodes.len() {
            let Some(parent_id) = self.nodes[c].parent_id.clone() else {
                continue;
            };
            let child_id = self.nodes[c].id.clone();
            if let Some(&p) = index.get(&parent_id) {
                if !self.nodes[p].child_ids.contains(&child_id) {
                    debug!(parent = %parent_id, child = %child_id, "restoring missing childIds entry");
                    self.nodes[p].child_ids.push(child_id);
                }
            }
        }

        // Break parent cycles at the node where the walk closes
        for i in 0..self.nodes.len() {
            let id = self.nodes[i].id.clone();
            if self.nodes[i].parent_id.is_some() && self.is_ancestor(&id, &id) {
                if let Some(parent) = self.nodes[i].parent_id.clone() {
                    warn!(node = %id, parent = %parent, "breaking parent cycle");
                    self.unparent(&parent, &id);
                }
            }
        }

        // Links are symmetric
        let links: Vec<(NodeId, NodeId)> = self
            .nodes
            .iter()
            .flat_map(|n| n.linked_node_ids.iter().map(move |l| (n.id.clone(), l.clone())))
            .collect();
        for (a, b) in links {
            if !self.is_linked(&b, &a) {
                warn!(from = %a, to = %b, "completing one-sided link");
                self.link(&a, &b);
            }
        }
    }
}

impl From<CanvasData> for CanvasGraph {
    fn from(data: CanvasData) -> Self {
        Self::from_data(data)
    }
}

