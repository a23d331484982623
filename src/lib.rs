//! AuthorStudio: track-changes reconciliation and plot canvas graph engine
//!
//! The core of a collaborative novel-writing tool: chapter content as a
//! rich-text document tree with tracked insertions and deletions, and the
//! plot/character/world canvas graph.
//!
//! # Core Concepts
//!
//! - **Document Model**: the editor's JSON tree; track-change metadata lives in marks
//! - **Changes**: derived from a document snapshot, decided by accept/reject,
//!   folded into final content by consolidation
//! - **Canvas Graph**: nodes with a parent/child tree axis and a symmetric
//!   linked axis; edges are derived and converted in place
//!
//! # Example
//!
//! ```
//! use authorstudio::{accept, consolidate, extract_changes, Author, DocNode, Mark};
//!
//! let ada = Author::new("u1", "Ada");
//! let doc = DocNode::doc(vec![DocNode::paragraph(vec![
//!     DocNode::text("Hello "),
//!     DocNode::text("world").with_mark(Mark::insertion("c1", &ada, 0)),
//! ])]);
//!
//! assert_eq!(extract_changes(&doc)[0].text, "world");
//! let saved = consolidate(&accept(&doc, "c1"));
//! assert_eq!(saved.plain_text(), "Hello world");
//! ```

pub mod ai;
pub mod canvas;
pub mod changes;
pub mod config;
pub mod document;
pub mod session;
pub mod storage;

pub use canvas::{
    CanvasData, CanvasEdge, CanvasError, CanvasGraph, CanvasNode, CanvasResult, CanvasView,
    EdgeAction, EdgeKey, EdgeState, NodeId, NodeType,
};
pub use changes::{accept, consolidate, extract_changes, reject, resolve, Change};
pub use config::Config;
pub use document::{Author, ChangeType, DocNode, Mark, Resolution};
pub use session::{CancellationToken, EditorSession, SessionConfig};
pub use storage::{
    CanvasKey, CanvasStore, ChapterStore, OpenStore, SqliteStore, StorageError, StorageResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
