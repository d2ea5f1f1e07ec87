// Error taxonomy for the task store

use thiserror::Error;

/// Failures the store surfaces to its caller.
///
/// Empty labels and unknown ids are not in here: those are expected
/// conditions and the store treats them as no-ops.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `reorder` was given an index outside `[0, len)`
    #[error("index {index} out of range for collection of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Stored blob exists but is not a valid task collection
    #[error("stored data under key '{key}' is corrupt")]
    PersistenceCorrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Backend failed to read or write. In-memory state is kept.
    #[error("persistence backend failed")]
    Backend(#[from] BackendError),
}

/// Failures raised by a persistence backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
