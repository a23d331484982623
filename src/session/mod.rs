//! Session-scoped state: the live chapter document, autosave and cancellation
//!
//! Session context is passed explicitly through [`SessionConfig`]; nothing
//! here reads global state.

mod cancel;
mod debounce;
mod editor;

pub use cancel::CancellationToken;
pub use debounce::{CanvasSink, ChapterSink, DebouncedSaver, SaveSink};
pub use editor::{EditorSession, Extraction};

use crate::document::Author;
use crate::storage::CanvasKey;
use std::time::Duration;

/// Default delay before an autosave is written
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Who is editing which book version, and how
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub author: Author,
    pub canvas: CanvasKey,
    pub save_debounce: Duration,
    pub llm_model: String,
}

impl SessionConfig {
    pub fn new(author: Author, canvas: CanvasKey) -> Self {
        Self {
            author,
            canvas,
            save_debounce: DEFAULT_SAVE_DEBOUNCE,
            llm_model: "default".to_string(),
        }
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.save_debounce = delay;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.llm_model = model.into();
        self
    }
}
