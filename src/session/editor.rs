//! Editor session: the single owner of one chapter's live document

use super::SessionConfig;
use crate::changes::{consolidate, extract_changes, resolve, Change};
use crate::document::{DocNode, Resolution};
use crate::storage::{ChapterStore, StorageResult};
use tracing::{debug, warn};

/// Change list computed from one document revision
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub revision: u64,
    pub changes: Vec<Change>,
}

/// Holds the live document for one chapter and numbers its revisions
///
/// Every editor update, accept and reject bumps the revision so that results
/// computed from an older snapshot can be recognised and discarded.
#[derive(Debug, Clone)]
pub struct EditorSession {
    config: SessionConfig,
    chapter_id: String,
    doc: DocNode,
    revision: u64,
}

impl EditorSession {
    pub fn new(config: SessionConfig, chapter_id: impl Into<String>, doc: DocNode) -> Self {
        Self {
            config,
            chapter_id: chapter_id.into(),
            doc,
            revision: 0,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn chapter_id(&self) -> &str {
        &self.chapter_id
    }

    pub fn document(&self) -> &DocNode {
        &self.doc
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace the document with the editor's latest snapshot
    pub fn apply_update(&mut self, doc: DocNode) -> u64 {
        self.doc = doc;
        self.revision += 1;
        self.revision
    }

    pub fn extract(&self) -> Extraction {
        Extraction {
            revision: self.revision,
            changes: extract_changes(&self.doc),
        }
    }

    pub fn is_current(&self, extraction: &Extraction) -> bool {
        extraction.revision == self.revision
    }

    /// The extraction's changes if it still matches the live document
    pub fn fresh_changes(&self, extraction: Extraction) -> Option<Vec<Change>> {
        if self.is_current(&extraction) {
            Some(extraction.changes)
        } else {
            warn!(
                chapter = %self.chapter_id,
                stale = extraction.revision,
                current = self.revision,
                "discarding stale change extraction"
            );
            None
        }
    }

    pub fn accept(&mut self, change_id: &str) -> bool {
        self.decide(change_id, Resolution::Accepted)
    }

    pub fn reject(&mut self, change_id: &str) -> bool {
        self.decide(change_id, Resolution::Rejected)
    }

    /// Record a decision and consolidate the live document
    ///
    /// Returns `false`, leaving the revision unchanged, when nothing changed.
    pub fn decide(&mut self, change_id: &str, resolution: Resolution) -> bool {
        let next = consolidate(&resolve(&self.doc, change_id, resolution));
        if next == self.doc {
            debug!(chapter = %self.chapter_id, change_id, "decision changed nothing");
            return false;
        }
        self.doc = next;
        self.revision += 1;
        debug!(
            chapter = %self.chapter_id,
            change_id,
            ?resolution,
            revision = self.revision,
            "applied decision"
        );
        true
    }

    /// Consolidated copy of the document, ready to persist
    pub fn save_payload(&self) -> DocNode {
        consolidate(&self.doc)
    }

    pub fn save_to(&self, store: &dyn ChapterStore) -> StorageResult<()> {
        store.put_chapter(&self.config.canvas, &self.chapter_id, &self.save_payload())
    }
}
