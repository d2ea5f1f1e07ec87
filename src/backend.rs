// Key/value persistence backends

use crate::error::BackendError;
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

const CURRENT_VERSION: u32 = 1;

/// Named-blob storage the store writes through to.
///
/// Both operations may fail; callers decide how much to trust the result.
pub trait Backend {
    /// Read the blob stored under `key`, `None` if nothing was saved
    fn load(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Replace the blob stored under `key`
    fn save(&mut self, key: &str, value: &str) -> Result<(), BackendError>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn load(&self, key: &str) -> Result<Option<String>, BackendError> {
        (**self).load(key)
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        (**self).save(key, value)
    }
}

fn validate_key(key: &str) -> Result<(), BackendError> {
    if key.is_empty() {
        return Err(BackendError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.len() > 64 {
        return Err(BackendError::InvalidKey(format!("key too long: {} (max 64 chars)", key)));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(BackendError::InvalidKey(format!(
            "invalid key: {} (must be alphanumeric with _/-)",
            key
        )));
    }
    Ok(())
}

// ============================================================================
// In-memory
// ============================================================================

/// Volatile backend, mostly for tests and throwaway sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `key` already holding `value`
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl Backend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<String>, BackendError> {
        validate_key(key)?;
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        validate_key(key)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// One file per key
// ============================================================================

/// Stores each key as `{key}.json` inside a directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    base_path: PathBuf,
}

impl FileBackend {
    /// Open or create a file store rooted at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BackendError> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let backend = Self { base_path };
        backend.create_gitignore()?;
        backend.write_version()?;

        debug!(path = ?backend.base_path, "Opened file backend");
        Ok(backend)
    }

    /// Keep lock files and half-written temp files out of version control
    fn create_gitignore(&self) -> Result<(), BackendError> {
        let gitignore_path = self.base_path.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(gitignore_path, "*.lock\n.tmp*\n")?;
        }
        Ok(())
    }

    fn write_version(&self) -> Result<(), BackendError> {
        let version_path = self.base_path.join(".version");
        if !version_path.exists() {
            fs::write(version_path, CURRENT_VERSION.to_string())?;
        }
        Ok(())
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, BackendError> {
        validate_key(key)?;
        Ok(self.base_path.join(format!("{}.json", key)))
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.lock", key))
    }
}

impl Backend for FileBackend {
    fn load(&self, key: &str) -> Result<Option<String>, BackendError> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        // Saves replace the file by rename, so a read sees either the old or the new blob
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        let path = self.key_path(key)?;

        // Serialize writers; the lock is released when the file is dropped
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path(key))?;
        lock.lock_exclusive()?;

        let mut tmp = NamedTempFile::new_in(&self.base_path)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| BackendError::Io(e.error))?;

        debug!(key, bytes = value.len(), "Saved blob to file");
        Ok(())
    }
}

// ============================================================================
// SQLite key/value table
// ============================================================================

/// Stores blobs in a single SQLite `kv` table
pub struct SqliteBackend {
    db: Connection,
}

impl SqliteBackend {
    /// Open or create `todostore.db` inside `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BackendError> {
        fs::create_dir_all(path.as_ref())?;
        let db = Connection::open(path.as_ref().join("todostore.db"))?;
        Self::with_connection(db)
    }

    pub fn open_in_memory() -> Result<Self, BackendError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(db: Connection) -> Result<Self, BackendError> {
        let backend = Self { db };
        backend.create_schema()?;
        info!("Opened SQLite backend");
        Ok(backend)
    }

    fn create_schema(&self) -> Result<(), BackendError> {
        debug!("Creating database schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }
}

impl Backend for SqliteBackend {
    fn load(&self, key: &str) -> Result<Option<String>, BackendError> {
        validate_key(key)?;

        let value = self
            .db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;

        Ok(value)
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        validate_key(key)?;

        self.db.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, now_ms()],
        )?;

        debug!(key, bytes = value.len(), "Saved blob to SQLite");
        Ok(())
    }
}

// Helper function for timestamps
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
