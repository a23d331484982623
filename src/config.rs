//! File-based configuration
//!
//! ```yaml
//! db_path: /home/me/.local/share/authorstudio/authorstudio.db
//! save_debounce_ms: 500
//! llm_model: default
//! rephrase_command: ["authorstudio-llm", "--stdio"]
//! author:
//!   id: u1
//!   name: Ada
//! ```
//!
//! Every field is optional; a missing file means all defaults.

use crate::document::Author;
use crate::session::SessionConfig;
use crate::storage::CanvasKey;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: Option<PathBuf>,
    pub save_debounce_ms: u64,
    pub llm_model: String,
    pub rephrase_command: Vec<String>,
    pub author: Author,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            save_debounce_ms: 500,
            llm_model: "default".to_string(),
            rephrase_command: Vec::new(),
            author: Author::new("local", "Local Author"),
        }
    }
}

impl Config {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Load from the default location
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(default_config_path())
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(default_db_path)
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    /// Session settings for editing one book version
    pub fn session(&self, canvas: CanvasKey) -> SessionConfig {
        SessionConfig::new(self.author.clone(), canvas)
            .with_debounce(self.save_debounce())
            .with_model(self.llm_model.clone())
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"))
        .join("authorstudio")
}

pub fn default_db_path() -> PathBuf {
    data_dir().join("authorstudio.db")
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("authorstudio"))
        .unwrap_or_else(data_dir)
        .join("config.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.save_debounce(), Duration::from_millis(500));
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let config = Config::from_yaml(
            "llm_model: qwen\nrephrase_command: [llm-local, --stdio]\nauthor:\n  id: u7\n  name: Grace\n",
        )
        .unwrap();
        assert_eq!(config.llm_model, "qwen");
        assert_eq!(config.rephrase_command, vec!["llm-local", "--stdio"]);
        assert_eq!(config.author.name, "Grace");
        assert_eq!(config.save_debounce_ms, 500);
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "save_debounce_ms: [not, a, number]").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn session_carries_author_and_timing() {
        let config = Config::from_yaml("save_debounce_ms: 250").unwrap();
        let session = config.session(CanvasKey::new("book", "v1"));
        assert_eq!(session.save_debounce, Duration::from_millis(250));
        assert_eq!(session.llm_model, "default");
        assert_eq!(session.canvas.book_id, "book");
    }

    #[test]
    fn default_db_lives_under_app_directory() {
        let path = default_db_path();
        assert!(path.ends_with("authorstudio/authorstudio.db"));
    }
}
