//! JSON file export/import of canvas snapshots

use super::traits::StorageResult;
use crate::canvas::CanvasData;
use std::path::Path;
use tracing::debug;

/// Serialize a canvas to pretty-printed JSON
pub fn export_canvas_string(data: &CanvasData) -> StorageResult<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

pub fn import_canvas_str(json: &str) -> StorageResult<CanvasData> {
    Ok(serde_json::from_str(json)?)
}

/// Write a canvas to `path`, creating parent directories as needed
pub fn export_canvas(path: impl AsRef<Path>, data: &CanvasData) -> StorageResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, export_canvas_string(data)?)?;
    debug!(path = %path.display(), nodes = data.nodes.len(), "exported canvas");
    Ok(())
}

pub fn import_canvas(path: impl AsRef<Path>) -> StorageResult<CanvasData> {
    let json = std::fs::read_to_string(path.as_ref())?;
    import_canvas_str(&json)
}
