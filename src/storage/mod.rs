//! Storage backends
//!
//! Canvas snapshots and chapter documents persist through the `CanvasStore`
//! and `ChapterStore` traits. `SqliteStore` is the local store; canvases can
//! also be exported to and imported from JSON files.

mod file;
mod sqlite;
mod traits;

pub use file::{export_canvas, export_canvas_string, import_canvas, import_canvas_str};
pub use sqlite::SqliteStore;
pub use traits::{CanvasKey, CanvasStore, ChapterStore, OpenStore, StorageError, StorageResult};
