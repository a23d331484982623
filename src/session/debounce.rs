//! Debounced autosave: last write wins per key

use crate::canvas::CanvasData;
use crate::document::DocNode;
use crate::storage::{CanvasKey, CanvasStore, ChapterStore, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Destination for debounced saves
#[async_trait]
pub trait SaveSink<T>: Send + Sync {
    async fn save(&self, key: &str, payload: T) -> StorageResult<()>;
}

/// Saves chapter documents for one book version; the key is the chapter id
pub struct ChapterSink<S> {
    store: Arc<S>,
    canvas: CanvasKey,
}

impl<S> ChapterSink<S> {
    pub fn new(store: Arc<S>, canvas: CanvasKey) -> Self {
        Self { store, canvas }
    }
}

#[async_trait]
impl<S: ChapterStore + 'static> SaveSink<DocNode> for ChapterSink<S> {
    async fn save(&self, chapter_id: &str, doc: DocNode) -> StorageResult<()> {
        let store = Arc::clone(&self.store);
        let canvas = self.canvas.clone();
        let chapter_id = chapter_id.to_string();
        tokio::task::spawn_blocking(move || store.save_chapter(&canvas, &chapter_id, &doc)).await?
    }
}

/// Saves canvas snapshots; the key must be the payload's `book_id/version_id`
///
/// Use [`DebouncedSaver::schedule_canvas`] to derive the key from the payload.
pub struct CanvasSink<S> {
    store: Arc<S>,
}

impl<S> CanvasSink<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: CanvasStore + 'static> SaveSink<(CanvasKey, CanvasData)> for CanvasSink<S> {
    async fn save(&self, key: &str, payload: (CanvasKey, CanvasData)) -> StorageResult<()> {
        let (canvas, data) = payload;
        if key != canvas.to_string() {
            return Err(StorageError::KeyMismatch {
                key: key.to_string(),
                canvas: canvas.to_string(),
            });
        }
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.save_canvas(&canvas, &data)).await?
    }
}

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct State {
    next_generation: u64,
    pending: HashMap<String, Pending>,
}

/// Coalesces rapid saves: each `schedule` restarts the delay for its key and
/// only the latest payload is written
///
/// A save whose delay has elapsed is no longer pending and runs to completion
/// even if a newer payload is scheduled meanwhile. Must be used inside a
/// tokio runtime.
pub struct DebouncedSaver<T> {
    delay: Duration,
    sink: Arc<dyn SaveSink<T>>,
    state: Arc<Mutex<State>>,
}

impl<T: Send + 'static> DebouncedSaver<T> {
    pub fn new(delay: Duration, sink: Arc<dyn SaveSink<T>>) -> Self {
        Self {
            delay,
            sink,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `payload` for `key`, replacing any save still waiting
    pub fn schedule(&self, key: impl Into<String>, payload: T) {
        let key = key.into();
        let mut state = self.state.lock().unwrap();
        if let Some(previous) = state.pending.remove(&key) {
            previous.handle.abort();
            debug!(key = %key, "superseded pending save");
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        let delay = self.delay;
        let sink = Arc::clone(&self.sink);
        let shared = Arc::clone(&self.state);
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut state = shared.lock().unwrap();
                match state.pending.get(&task_key) {
                    Some(p) if p.generation == generation => {
                        state.pending.remove(&task_key);
                    }
                    _ => return,
                }
            }
            match sink.save(&task_key, payload).await {
                Ok(()) => debug!(key = %task_key, "debounced save written"),
                Err(e) => warn!(key = %task_key, error = %e, "debounced save failed"),
            }
        });
        state.pending.insert(key, Pending { generation, handle });
    }

    /// Drop the waiting save for `key`; returns `false` if none was waiting
    pub fn cancel(&self, key: &str) -> bool {
        let removed = self.state.lock().unwrap().pending.remove(key);
        match removed {
            Some(p) => {
                p.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Number of keys with a save still waiting for its delay
    pub fn pending(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }
}

impl DebouncedSaver<(CanvasKey, CanvasData)> {
    /// Schedule a canvas snapshot under its own `book_id/version_id`
    pub fn schedule_canvas(&self, canvas: CanvasKey, data: CanvasData) {
        self.schedule(canvas.to_string(), (canvas, data));
    }
}

impl<T> Drop for DebouncedSaver<T> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            for (_, p) in state.pending.drain() {
                p.handle.abort();
            }
        }
    }
}
