//! Storage trait definitions

use crate::canvas::CanvasData;
use crate::changes::consolidate;
use crate::document::DocNode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Save key {key} does not match canvas {canvas}")]
    KeyMismatch { key: String, canvas: String },

    #[error("Background save failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Identifies the book version a canvas or chapter belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasKey {
    pub book_id: String,
    pub version_id: String,
}

impl CanvasKey {
    pub fn new(book_id: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self {
            book_id: book_id.into(),
            version_id: version_id.into(),
        }
    }
}

impl std::fmt::Display for CanvasKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.book_id, self.version_id)
    }
}

/// Persistence for canvas snapshots, one per book version
///
/// Implementations must be thread-safe (Send + Sync).
pub trait CanvasStore: Send + Sync {
    /// Create or replace the canvas for a book version
    fn save_canvas(&self, key: &CanvasKey, data: &CanvasData) -> StorageResult<()>;

    fn load_canvas(&self, key: &CanvasKey) -> StorageResult<Option<CanvasData>>;

    fn delete_canvas(&self, key: &CanvasKey) -> StorageResult<bool>;

    fn list_canvases(&self) -> StorageResult<Vec<CanvasKey>>;
}

/// Persistence for chapter documents
pub trait ChapterStore: Send + Sync {
    /// Write a document exactly as given
    fn put_chapter(&self, key: &CanvasKey, chapter_id: &str, doc: &DocNode) -> StorageResult<()>;

    fn load_chapter(&self, key: &CanvasKey, chapter_id: &str) -> StorageResult<Option<DocNode>>;

    fn delete_chapter(&self, key: &CanvasKey, chapter_id: &str) -> StorageResult<bool>;

    /// Chapter ids stored for a book version, sorted
    fn list_chapters(&self, key: &CanvasKey) -> StorageResult<Vec<String>>;

    /// Save a chapter; decided track changes are consolidated first
    fn save_chapter(&self, key: &CanvasKey, chapter_id: &str, doc: &DocNode) -> StorageResult<()> {
        self.put_chapter(key, chapter_id, &consolidate(doc))
    }
}

/// Extension trait for opening stores from paths
pub trait OpenStore: Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
