//! Change consolidation

use crate::document::{DocNode, Mark, MarkClass, TrackChange};
use tracing::{debug, warn};

/// Resolve decided track-change marks into final content
///
/// Returns a new tree; the input is not modified.
///
/// - accepted insertion / rejected deletion: text kept, decoration removed
/// - accepted deletion / rejected insertion: text removed
/// - pending: mark kept as-is
/// - malformed tracking marks: decoration removed, text kept
///
/// Adjacent text leaves left carrying the same pending change with the same
/// styling are merged into one run.
pub fn consolidate(doc: &DocNode) -> DocNode {
    let mut stats = Stats::default();
    let out = consolidate_node(doc, &mut stats);
    if stats.malformed > 0 {
        warn!(
            count = stats.malformed,
            "malformed track-change marks treated as plain content"
        );
    }
    debug!(
        removed = stats.removed,
        unmarked = stats.unmarked,
        merged = stats.merged,
        "consolidated document"
    );
    out
}

#[derive(Default)]
struct Stats {
    removed: usize,
    unmarked: usize,
    merged: usize,
    malformed: usize,
}

fn consolidate_node(node: &DocNode, stats: &mut Stats) -> DocNode {
    let mut out = shallow_copy(node);
    for child in &node.children {
        if child.is_text() {
            if let Some(text) = consolidate_text(child, stats) {
                push_text(&mut out.children, text, stats);
            }
        } else {
            out.children.push(consolidate_node(child, stats));
        }
    }
    out
}

/// Applies mark decisions to one text leaf; `None` when the text is removed.
fn consolidate_text(node: &DocNode, stats: &mut Stats) -> Option<DocNode> {
    if node.text_content().is_empty() {
        stats.removed += 1;
        return None;
    }

    let mut marks = Vec::with_capacity(node.marks.len());
    let mut touched = false;

    for mark in &node.marks {
        match mark.classify() {
            MarkClass::Style => marks.push(mark.clone()),
            MarkClass::Malformed => {
                stats.malformed += 1;
                touched = true;
                marks.extend(mark.strip_tracking());
            }
            MarkClass::TrackChange(tc) => match tc.keeps_text() {
                None => marks.push(mark.clone()),
                Some(true) => {
                    touched = true;
                    marks.extend(mark.strip_tracking());
                }
                Some(false) => {
                    stats.removed += 1;
                    return None;
                }
            },
        }
    }

    if touched {
        stats.unmarked += 1;
    }
    Some(DocNode {
        marks,
        ..node.clone()
    })
}

fn push_text(siblings: &mut Vec<DocNode>, node: DocNode, stats: &mut Stats) {
    if let Some(prev) = siblings.last_mut() {
        if prev.is_text() && same_pending_run(&prev.marks, &node.marks) {
            let text = prev.text.get_or_insert_with(String::new);
            text.push_str(node.text_content());
            stats.merged += 1;
            return;
        }
    }
    siblings.push(node);
}

fn pending_change(marks: &[Mark]) -> Option<TrackChange> {
    marks
        .iter()
        .filter_map(Mark::track_change)
        .find(|tc| tc.keeps_text().is_none())
}

/// True when both runs carry the same pending change and identical styling
fn same_pending_run(a: &[Mark], b: &[Mark]) -> bool {
    let (Some(left), Some(right)) = (pending_change(a), pending_change(b)) else {
        return false;
    };
    left.change_id == right.change_id
        && left.change_type == right.change_type
        && styling(a) == styling(b)
}

fn styling(marks: &[Mark]) -> Vec<Mark> {
    marks.iter().filter_map(Mark::strip_tracking).collect()
}

fn shallow_copy(node: &DocNode) -> DocNode {
    DocNode {
        kind: node.kind.clone(),
        attributes: node.attributes.clone(),
        marks: node.marks.clone(),
        children: Vec::with_capacity(node.children.len()),
        text: node.text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Author, ChangeType, Resolution};

    fn ada() -> Author {
        Author::new("u1", "Ada")
    }

    #[test]
    fn merges_character_level_runs_of_one_change() {
        let doc = DocNode::doc(vec![DocNode::paragraph(vec![
            DocNode::text("Hel").with_mark(Mark::insertion("c1", &ada(), 1)),
            DocNode::text("lo").with_mark(Mark::insertion("c1", &ada(), 1)),
            DocNode::text("!").with_mark(Mark::insertion("c2", &ada(), 2)),
        ])]);

        let out = consolidate(&doc);
        let para = &out.children[0];
        assert_eq!(para.children.len(), 2);
        assert_eq!(para.children[0].text_content(), "Hello");
        assert_eq!(para.children[1].text_content(), "!");
    }

    #[test]
    fn does_not_merge_runs_with_different_styling() {
        let doc = DocNode::doc(vec![DocNode::paragraph(vec![
            DocNode::text("a").with_mark(Mark::insertion("c1", &ada(), 1)),
            DocNode::text("b")
                .with_mark(Mark::insertion("c1", &ada(), 1))
                .with_mark(Mark::new("bold")),
        ])]);

        let out = consolidate(&doc);
        assert_eq!(out.children[0].children.len(), 2);
    }

    #[test]
    fn legacy_accepted_insertion_keeps_styling() {
        let mark = Mark::legacy("c1", ChangeType::Insertion, &ada(), 1)
            .with_attr("color", serde_json::Value::from("red"))
            .with_resolution(Resolution::Accepted);
        let doc = DocNode::doc(vec![DocNode::paragraph(vec![
            DocNode::text("hi").with_mark(mark),
        ])]);

        let out = consolidate(&doc);
        let leaf = &out.children[0].children[0];
        assert_eq!(leaf.text_content(), "hi");
        assert_eq!(leaf.marks.len(), 1);
        assert_eq!(leaf.marks[0].attrs.len(), 1);
        assert!(leaf.marks[0].track_change().is_none());
    }

    #[test]
    fn empty_text_leaves_are_dropped() {
        let doc = DocNode::doc(vec![DocNode::paragraph(vec![
            DocNode::text(""),
            DocNode::text("kept"),
        ])]);

        let out = consolidate(&doc);
        assert_eq!(out.children[0].children.len(), 1);
        assert_eq!(out.children[0].children[0].text_content(), "kept");
    }

    #[test]
    fn input_is_left_untouched() {
        let doc = DocNode::doc(vec![DocNode::paragraph(vec![DocNode::text("gone")
            .with_mark(Mark::insertion("c1", &ada(), 1).with_resolution(Resolution::Rejected))])]);
        let before = doc.clone();

        let out = consolidate(&doc);
        assert_eq!(doc, before);
        assert_eq!(out.plain_text(), "");
    }
}
