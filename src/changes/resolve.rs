//! Recording accept/reject decisions on track-change marks

use crate::document::{DocNode, Mark, Resolution};

/// Copy of `doc` with every mark of `change_id` set to `resolution`
///
/// An unknown id yields an identical copy.
pub fn resolve(doc: &DocNode, change_id: &str, resolution: Resolution) -> DocNode {
    let mut out = doc.clone();
    resolve_in_place(&mut out, change_id, resolution);
    out
}

pub fn accept(doc: &DocNode, change_id: &str) -> DocNode {
    resolve(doc, change_id, Resolution::Accepted)
}

pub fn reject(doc: &DocNode, change_id: &str) -> DocNode {
    resolve(doc, change_id, Resolution::Rejected)
}

fn resolve_in_place(node: &mut DocNode, change_id: &str, resolution: Resolution) {
    for mark in node.marks.iter_mut() {
        if matches_change(mark, change_id) {
            *mark = mark.with_resolution(resolution);
        }
    }
    for child in node.children.iter_mut() {
        resolve_in_place(child, change_id, resolution);
    }
}

fn matches_change(mark: &Mark, change_id: &str) -> bool {
    mark.track_change()
        .is_some_and(|tc| tc.change_id == change_id)
}
