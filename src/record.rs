// Trait for values persisted as a collection under a named key

use serde::{Deserialize, Serialize};

/// Core trait that any storable record must implement
pub trait Record: Serialize + for<'de> Deserialize<'de> + Clone + 'static {
    /// Unique identifier for this record within its collection
    fn id(&self) -> &str;

    /// Backend key the whole collection is stored under (e.g. "todos")
    fn storage_key() -> &'static str
    where
        Self: Sized;
}
