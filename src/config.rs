//! Configuration loading.
//!
//! Read from `<config_dir>/todostore/config.yaml`. Every field has a default,
//! so a missing file or a partial file is fine.

use crate::backend::{Backend, FileBackend, SqliteBackend};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "todostore";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory the backend keeps its data in
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub backend: BackendKind,

    /// Tracing level for the CLI (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: BackendKind::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".todostore"))
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Storage engine behind the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    File,
    Sqlite,
}

impl Config {
    /// Default config file location, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load from `path` (or the default location); a missing file yields defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(p) => p,
            None => return Ok(Self::default()),
        };

        if !path.exists() {
            debug!(path = ?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        Self::load(&path)
    }

    /// Open the configured backend
    pub fn open_backend(&self) -> Result<Box<dyn Backend>> {
        let backend: Box<dyn Backend> = match self.backend {
            BackendKind::File => Box::new(
                FileBackend::open(&self.data_dir)
                    .with_context(|| format!("Failed to open file store at {}", self.data_dir.display()))?,
            ),
            BackendKind::Sqlite => Box::new(
                SqliteBackend::open(&self.data_dir)
                    .with_context(|| format!("Failed to open SQLite store at {}", self.data_dir.display()))?,
            ),
        };
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend, BackendKind::File);
        assert_eq!(config.log_level, "warn");
        assert!(config.data_dir.ends_with(APP_DIR) || config.data_dir == Path::new(".todostore"));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("backend: sqlite\n").unwrap();
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "data_dir: /tmp/todos\nbackend: file\nlog_level: debug\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/todos"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_or_default(Some(&temp.path().join("nope.yaml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_malformed_file_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "backend: [not, a, backend]\n").unwrap();
        assert!(Config::load_or_default(Some(&path)).is_err());
    }

    #[test]
    fn test_open_backend_kinds() {
        let temp = TempDir::new().unwrap();
        for kind in [BackendKind::File, BackendKind::Sqlite] {
            let config = Config {
                data_dir: temp.path().join(format!("{:?}", kind)),
                backend: kind,
                ..Config::default()
            };
            let mut backend = config.open_backend().unwrap();
            backend.save("todos", "[]").unwrap();
            assert_eq!(backend.load("todos").unwrap().as_deref(), Some("[]"));
        }
    }
}
