//! Document Model: the rich-text tree for one chapter
//!
//! The tree uses the embedded editor's JSON snapshot shape
//! (`type` / `attrs` / `marks` / `content` / `text`). Text leaves carry
//! marks; track-change metadata lives in marks as well.

mod mark;
mod node;

pub use mark::{Author, ChangeType, Mark, MarkClass, Resolution, TrackChange};
pub use node::{DocNode, NodeKind, NodePath};

pub(crate) use node::null_as_default;
