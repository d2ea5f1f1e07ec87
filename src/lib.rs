// TodoStore - Task list state with write-through key/value persistence

pub mod backend;
pub mod config;
pub mod error;
pub mod filter;
pub mod ids;
pub mod record;
pub mod store;
pub mod task;
pub mod theme;

// Re-export main types for convenience
pub use backend::{Backend, FileBackend, MemoryBackend, SqliteBackend};
pub use config::{BackendKind, Config};
pub use error::{BackendError, StoreError};
pub use filter::FilterMode;
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use record::Record;
pub use store::{Collection, Store};
pub use task::{DeadlineEdit, TagSet, Task, TaskEdit, parse_deadline};
pub use theme::Theme;
