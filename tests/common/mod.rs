//! Shared fixtures for integration tests
//!
//! Chapters and canvases shaped like the ones the editor and canvas
//! views produce.

#![allow(dead_code)]

use authorstudio::canvas::{CanvasData, CanvasNode, NodeType};
use authorstudio::{Author, CanvasGraph, DocNode, Mark, NodeId};
use serde_json::{json, Value};

pub fn ada() -> Author {
    Author::new("u1", "Ada")
}

pub fn grace() -> Author {
    Author::new("u2", "Grace")
}

/// Two paragraphs: an insertion by Ada and a deletion by Grace, plus one
/// bold run that is plain styling.
pub fn chapter_with_edits() -> DocNode {
    DocNode::doc(vec![
        DocNode::heading(1, vec![DocNode::text("Chapter One")]),
        DocNode::paragraph(vec![
            DocNode::text("The storm "),
            DocNode::text("finally ").with_mark(Mark::insertion("ins-1", &ada(), 1_000)),
            DocNode::text("broke.").with_mark(Mark::new("bold")),
        ]),
        DocNode::paragraph(vec![
            DocNode::text("She ran "),
            DocNode::text("very ").with_mark(Mark::deletion("del-1", &grace(), 2_000)),
            DocNode::text("fast."),
        ]),
    ])
}

/// The same kind of chapter as the editor serializes it
pub fn chapter_json() -> Value {
    json!({
        "type": "doc",
        "content": [
            {
                "type": "paragraph",
                "content": [
                    { "type": "text", "text": "Keep " },
                    {
                        "type": "text",
                        "text": "this",
                        "marks": [{
                            "type": "trackChange",
                            "attrs": {
                                "changeId": "c-keep",
                                "changeType": "insertion",
                                "authorId": "u1",
                                "authorName": "Ada",
                                "timestamp": 1700000000000i64
                            }
                        }]
                    },
                    {
                        "type": "text",
                        "text": " and not that",
                        "marks": [{
                            "type": "trackChange",
                            "attrs": {
                                "changeId": "c-drop",
                                "changeType": "deletion",
                                "authorId": "u2",
                                "authorName": "Grace",
                                "timestamp": 1700000001000i64
                            }
                        }]
                    }
                ]
            }
        ]
    })
}

pub fn id(raw: &str) -> NodeId {
    NodeId::from(raw)
}

/// Plot canvas: an outline with two chapters under it and one scene under
/// the first chapter, plus a character linked to the scene.
pub fn plot_canvas() -> CanvasGraph {
    let mut graph = CanvasGraph::new();
    graph
        .add_node(CanvasNode::with_id("outline", NodeType::Outline, "Outline").at(0.0, 0.0))
        .unwrap();
    graph
        .add_child(&id("outline"), CanvasNode::with_id("ch1", NodeType::Chapter, "Chapter 1"))
        .unwrap();
    graph
        .add_child(&id("outline"), CanvasNode::with_id("ch2", NodeType::Chapter, "Chapter 2"))
        .unwrap();
    graph
        .add_child(&id("ch1"), CanvasNode::with_id("sc1", NodeType::SceneBeats, "Arrival"))
        .unwrap();
    graph
        .add_node(CanvasNode::with_id("mara", NodeType::Character, "Mara").at(600.0, 400.0))
        .unwrap();
    graph.on_connect(&id("sc1"), &id("mara")).unwrap();
    graph
}

/// A stored canvas with broken references, as older clients wrote them
pub fn damaged_canvas_json() -> String {
    json!({
        "nodes": [
            {
                "id": "p",
                "type": "Chapter",
                "name": "Parent",
                "childIds": ["c", "ghost"],
                "linkedNodeIds": ["c"]
            },
            {
                "id": "c",
                "type": "SceneBeats",
                "name": "Child",
                "parentId": "p",
                "linkedNodeIds": []
            },
            {
                "id": "lonely",
                "type": "Character",
                "name": "Lonely",
                "linkedNodeIds": ["lonely"]
            }
        ],
        "timelineEvents": [],
        "nodePositions": { "p": { "x": 10.0, "y": 20.0 } },
        "lastUpdated": "2024-05-01T12:00:00Z"
    })
    .to_string()
}

pub fn damaged_canvas() -> CanvasData {
    CanvasData::from_json(&damaged_canvas_json()).unwrap()
}
