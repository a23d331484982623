//! Canvas editing flows as the plot view drives them

mod common;

use authorstudio::canvas::{CanvasView, EdgeKind, NodeType, TimelineEvent, Violation};
use authorstudio::{CanvasError, CanvasGraph, CanvasNode, EdgeAction, EdgeState};
use common::{damaged_canvas, id, plot_canvas};

fn edge_ids(graph: &CanvasGraph) -> Vec<String> {
    let mut ids: Vec<_> = graph.derive_edges().into_iter().map(|e| e.id).collect();
    ids.sort();
    ids
}

#[test]
fn fixture_canvas_is_consistent() {
    let graph = plot_canvas();
    assert!(graph.check_invariants().is_empty());
    assert_eq!(
        edge_ids(&graph),
        [
            "link_sc1_mara",
            "parent_ch1_sc1",
            "parent_outline_ch1",
            "parent_outline_ch2",
        ]
    );
}

#[test]
fn link_then_promote_to_parent_then_back() {
    let mut graph = plot_canvas();
    assert!(graph.on_connect(&id("ch2"), &id("mara")).unwrap());

    let state = graph.convert_edge("link_ch2_mara", EdgeAction::ParentChild).unwrap();
    assert_eq!(state, EdgeState::ParentChild);
    assert_eq!(graph.node(&id("mara")).unwrap().parent_id, Some(id("ch2")));
    assert!(!graph.is_linked(&id("ch2"), &id("mara")));
    // the other link on mara is untouched
    assert!(graph.is_linked(&id("sc1"), &id("mara")));

    let state = graph.convert_edge("parent_ch2_mara", EdgeAction::Linked).unwrap();
    assert_eq!(state, EdgeState::Linked);
    assert_eq!(graph.node(&id("mara")).unwrap().parent_id, None);
    assert!(graph.is_linked(&id("mara"), &id("ch2")));
    assert!(graph.check_invariants().is_empty());
}

#[test]
fn promoting_a_link_to_an_ancestor_is_rejected() {
    let mut graph = plot_canvas();
    graph.on_connect(&id("sc1"), &id("outline")).unwrap();
    let before = edge_ids(&graph);

    let err = graph
        .convert_edge("link_sc1_outline", EdgeAction::ParentChild)
        .unwrap_err();
    assert_eq!(
        err,
        CanvasError::GraphCycle {
            parent: id("sc1"),
            child: id("outline"),
        }
    );
    assert_eq!(edge_ids(&graph), before);
}

#[test]
fn deleting_edges_is_idempotent() {
    let mut graph = plot_canvas();
    assert_eq!(
        graph.convert_edge("parent_outline_ch2", EdgeAction::Delete).unwrap(),
        EdgeState::Deleted
    );
    assert_eq!(
        graph.convert_edge("parent_outline_ch2", EdgeAction::Delete).unwrap(),
        EdgeState::Deleted
    );
    assert!(matches!(
        graph.convert_edge("parent_outline_ch2", EdgeAction::Linked),
        Err(CanvasError::EdgeNotFound(_))
    ));
    assert_eq!(graph.node(&id("ch2")).unwrap().parent_id, None);
}

#[test]
fn removing_a_chapter_orphans_its_scenes_and_drops_links() {
    let mut graph = plot_canvas();
    graph.on_connect(&id("ch1"), &id("mara")).unwrap();

    let removed = graph.remove_node(&id("ch1")).unwrap();
    assert_eq!(removed.name, "Chapter 1");

    assert_eq!(graph.node(&id("sc1")).unwrap().parent_id, None);
    assert!(!graph.node(&id("outline")).unwrap().has_child(&id("ch1")));
    assert!(!graph.node(&id("mara")).unwrap().is_linked_to(&id("ch1")));
    assert!(graph.check_invariants().is_empty());
    assert!(edge_ids(&graph).iter().all(|e| !e.contains("ch1")));
}

#[test]
fn root_plot_view_hides_characters_and_children() {
    let graph = plot_canvas();
    let visible: Vec<_> = graph
        .visible_nodes(&CanvasView::plot())
        .into_iter()
        .map(|n| n.id.as_str().to_string())
        .collect();
    assert_eq!(visible, ["outline"]);
}

#[test]
fn focus_view_shows_children_and_links() {
    let graph = plot_canvas();
    let view = CanvasView::Focus(id("ch1"));
    let visible: Vec<_> = graph
        .visible_nodes(&view)
        .into_iter()
        .map(|n| n.id.as_str().to_string())
        .collect();
    assert_eq!(visible, ["ch1", "sc1"]);

    let edges = graph.derive_edges_in(&view);
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].kind, EdgeKind::ParentChild);
}

#[test]
fn new_children_are_placed_below_their_parent() {
    let mut graph = plot_canvas();
    let parent = graph.node(&id("ch2")).unwrap().position.unwrap();
    let child = graph
        .add_child(&id("ch2"), CanvasNode::new(NodeType::SceneBeats, "Escape"))
        .unwrap();
    let placed = graph.node(&child).unwrap().position.unwrap();
    assert!(placed.y > parent.y);
}

#[test]
fn damaged_snapshot_is_repaired_on_load() {
    let graph = CanvasGraph::from_data(damaged_canvas());

    assert!(graph.check_invariants().is_empty());
    let parent = graph.node(&id("p")).unwrap();
    assert_eq!(parent.child_ids, vec![id("c")]);
    assert!(graph.node(&id("c")).unwrap().is_linked_to(&id("p")));
    assert!(graph.node(&id("lonely")).unwrap().linked_node_ids.is_empty());
    // nodePositions wins over the missing inline position
    let pos = parent.position.unwrap();
    assert_eq!((pos.x, pos.y), (10.0, 20.0));
    // every node ends up placed
    assert!(graph.nodes().iter().all(|n| n.position.is_some()));
}

#[test]
fn assign_parent_refuses_cycles() {
    let mut graph = plot_canvas();
    assert!(matches!(
        graph.assign_parent(&id("outline"), &id("sc1")),
        Err(CanvasError::GraphCycle { .. })
    ));
    assert!(!graph
        .check_invariants()
        .iter()
        .any(|v| matches!(v, Violation::ParentCycle(_))));
}

#[test]
fn inspect_reports_damage_before_repair() {
    let violations = CanvasGraph::inspect(&damaged_canvas());

    assert!(violations.contains(&Violation::Dangling {
        node: id("p"),
        missing: id("ghost"),
    }));
    assert!(violations.contains(&Violation::SelfReference(id("lonely"))));
    assert!(violations.contains(&Violation::AsymmetricLink {
        from: id("p"),
        to: id("c"),
    }));
    // loading still repairs everything
    assert!(CanvasGraph::from_data(damaged_canvas()).check_invariants().is_empty());
}

#[test]
fn inspect_is_clean_for_a_saved_canvas() {
    assert!(CanvasGraph::inspect(&plot_canvas().to_data()).is_empty());
}

#[test]
fn timeline_links_to_missing_nodes_are_dropped_on_load() {
    let mut data = plot_canvas().to_data();
    data.timeline_events.push(TimelineEvent {
        id: "storm".into(),
        name: "The storm".into(),
        linked_node_ids: vec![id("sc1"), id("ghost")],
        ..Default::default()
    });

    assert_eq!(
        CanvasGraph::inspect(&data),
        vec![Violation::DanglingTimelineLink {
            event: "storm".into(),
            missing: id("ghost"),
        }]
    );

    let graph = CanvasGraph::from_data(data);
    assert_eq!(graph.timeline_events()[0].linked_node_ids, vec![id("sc1")]);
    assert!(graph.check_invariants().is_empty());
}
