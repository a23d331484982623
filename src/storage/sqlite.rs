//! SQLite storage backend

use super::traits::{CanvasKey, CanvasStore, ChapterStore, OpenStore, StorageResult};
use crate::canvas::CanvasData;
use crate::document::DocNode;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// SQLite-backed canvas and chapter store
///
/// One database file with a table per aggregate. Canvas snapshots and
/// chapter documents are stored as JSON text. Thread-safe via internal mutex
/// on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS canvases (
                book_id TEXT NOT NULL,
                version_id TEXT NOT NULL,
                data_json TEXT NOT NULL,
                last_updated TEXT NOT NULL,
                PRIMARY KEY (book_id, version_id)
            );

            CREATE TABLE IF NOT EXISTS chapters (
                book_id TEXT NOT NULL,
                version_id TEXT NOT NULL,
                chapter_id TEXT NOT NULL,
                content_json TEXT NOT NULL,
                saved_at TEXT NOT NULL,
                PRIMARY KEY (book_id, version_id, chapter_id)
            );

            CREATE INDEX IF NOT EXISTS idx_chapters_version
                ON chapters(book_id, version_id);

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }
}

impl CanvasStore for SqliteStore {
    fn save_canvas(&self, key: &CanvasKey, data: &CanvasData) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let data_json = serde_json::to_string(data)?;

        conn.execute(
            r#"
            INSERT INTO canvases (book_id, version_id, data_json, last_updated)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(book_id, version_id) DO UPDATE SET
                data_json = excluded.data_json,
                last_updated = excluded.last_updated
            "#,
            params![
                key.book_id,
                key.version_id,
                data_json,
                data.last_updated.to_rfc3339(),
            ],
        )?;

        debug!(canvas = %key, nodes = data.nodes.len(), "saved canvas");
        Ok(())
    }

    fn load_canvas(&self, key: &CanvasKey) -> StorageResult<Option<CanvasData>> {
        let conn = self.conn.lock().unwrap();
        let data_json: Option<String> = conn
            .query_row(
                "SELECT data_json FROM canvases WHERE book_id = ?1 AND version_id = ?2",
                params![key.book_id, key.version_id],
                |row| row.get(0),
            )
            .optional()?;

        match data_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn delete_canvas(&self, key: &CanvasKey) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "DELETE FROM canvases WHERE book_id = ?1 AND version_id = ?2",
            params![key.book_id, key.version_id],
        )?;
        Ok(rows > 0)
    }

    fn list_canvases(&self) -> StorageResult<Vec<CanvasKey>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT book_id, version_id FROM canvases ORDER BY book_id, version_id")?;
        let keys = stmt
            .query_map([], |row| {
                Ok(CanvasKey::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

impl ChapterStore for SqliteStore {
    fn put_chapter(&self, key: &CanvasKey, chapter_id: &str, doc: &DocNode) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let content_json = serde_json::to_string(doc)?;

        conn.execute(
            r#"
            INSERT INTO chapters (book_id, version_id, chapter_id, content_json, saved_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(book_id, version_id, chapter_id) DO UPDATE SET
                content_json = excluded.content_json,
                saved_at = excluded.saved_at
            "#,
            params![
                key.book_id,
                key.version_id,
                chapter_id,
                content_json,
                Utc::now().to_rfc3339(),
            ],
        )?;

        debug!(canvas = %key, chapter = chapter_id, "saved chapter");
        Ok(())
    }

    fn load_chapter(&self, key: &CanvasKey, chapter_id: &str) -> StorageResult<Option<DocNode>> {
        let conn = self.conn.lock().unwrap();
        let content_json: Option<String> = conn
            .query_row(
                "SELECT content_json FROM chapters
                 WHERE book_id = ?1 AND version_id = ?2 AND chapter_id = ?3",
                params![key.book_id, key.version_id, chapter_id],
                |row| row.get(0),
            )
            .optional()?;

        match content_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn delete_chapter(&self, key: &CanvasKey, chapter_id: &str) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "DELETE FROM chapters WHERE book_id = ?1 AND version_id = ?2 AND chapter_id = ?3",
            params![key.book_id, key.version_id, chapter_id],
        )?;
        Ok(rows > 0)
    }

    fn list_chapters(&self, key: &CanvasKey) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT chapter_id FROM chapters
             WHERE book_id = ?1 AND version_id = ?2 ORDER BY chapter_id",
        )?;
        let ids = stmt
            .query_map(params![key.book_id, key.version_id], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CanvasGraph, CanvasNode, NodeType};
    use crate::document::{Author, Mark, Resolution};

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn key() -> CanvasKey {
        CanvasKey::new("book-1", "v1")
    }

    fn sample_canvas() -> CanvasData {
        let mut graph = CanvasGraph::new();
        let act = graph
            .add_node(CanvasNode::with_id("act-1", NodeType::Act, "Act I"))
            .unwrap();
        graph
            .add_child(&act, CanvasNode::with_id("ch-1", NodeType::Chapter, "Chapter 1"))
            .unwrap();
        graph.to_data()
    }

    #[test]
    fn test_save_and_load_canvas() {
        let store = create_test_store();
        let data = sample_canvas();
        store.save_canvas(&key(), &data).unwrap();

        let loaded = store.load_canvas(&key()).unwrap().unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn test_save_canvas_replaces_previous() {
        let store = create_test_store();
        store.save_canvas(&key(), &sample_canvas()).unwrap();
        store.save_canvas(&key(), &CanvasData::default()).unwrap();

        let loaded = store.load_canvas(&key()).unwrap().unwrap();
        assert!(loaded.nodes.is_empty());
        assert_eq!(store.list_canvases().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_canvas_loads_none() {
        let store = create_test_store();
        assert!(store.load_canvas(&key()).unwrap().is_none());
        assert!(!store.delete_canvas(&key()).unwrap());
    }

    #[test]
    fn test_list_and_delete_canvases() {
        let store = create_test_store();
        store.save_canvas(&CanvasKey::new("b", "v2"), &sample_canvas()).unwrap();
        store.save_canvas(&CanvasKey::new("a", "v1"), &sample_canvas()).unwrap();

        let keys = store.list_canvases().unwrap();
        assert_eq!(keys, vec![CanvasKey::new("a", "v1"), CanvasKey::new("b", "v2")]);

        assert!(store.delete_canvas(&CanvasKey::new("a", "v1")).unwrap());
        assert_eq!(store.list_canvases().unwrap().len(), 1);
    }

    #[test]
    fn test_save_chapter_consolidates() {
        let store = create_test_store();
        let author = Author::new("u1", "Ada");
        let doc = DocNode::doc(vec![DocNode::paragraph(vec![
            DocNode::text("kept "),
            DocNode::text("gone")
                .with_mark(Mark::insertion("c1", &author, 1).with_resolution(Resolution::Rejected)),
            DocNode::text("pending").with_mark(Mark::insertion("c2", &author, 2)),
        ])]);

        store.save_chapter(&key(), "chapter-1", &doc).unwrap();
        let loaded = store.load_chapter(&key(), "chapter-1").unwrap().unwrap();

        assert_eq!(loaded.plain_text(), "kept pending");
        assert!(loaded.has_track_changes());
    }

    #[test]
    fn test_list_and_delete_chapters() {
        let store = create_test_store();
        let doc = DocNode::doc(vec![DocNode::paragraph(vec![DocNode::text("x")])]);
        store.save_chapter(&key(), "b", &doc).unwrap();
        store.save_chapter(&key(), "a", &doc).unwrap();
        store
            .save_chapter(&CanvasKey::new("book-1", "v2"), "c", &doc)
            .unwrap();

        assert_eq!(store.list_chapters(&key()).unwrap(), vec!["a", "b"]);
        assert!(store.delete_chapter(&key(), "a").unwrap());
        assert!(!store.delete_chapter(&key(), "a").unwrap());
        assert!(store.load_chapter(&key(), "a").unwrap().is_none());
    }

    #[test]
    fn test_wal_mode_enabled_at_connection() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("test-wal.db");
        let store = SqliteStore::open(&db_path).unwrap();

        let journal_mode: String = store
            .conn
            .lock()
            .unwrap()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();

        assert_eq!(journal_mode, "wal");
    }
}
