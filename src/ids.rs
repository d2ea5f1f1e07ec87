// Identifier generation for new tasks

use uuid::Uuid;

/// Produces opaque ids for newly created tasks.
///
/// Implementations must not repeat an id within one session.
pub trait IdGenerator {
    fn new_id(&mut self) -> String;
}

/// Time-ordered UUID v7 ids
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn new_id(&mut self) -> String {
        Uuid::now_v7().to_string()
    }
}

/// Deterministic `{prefix}{n}` ids, counting up from 1
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("task-")
    }
}

impl IdGenerator for SequentialIds {
    fn new_id(&mut self) -> String {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uuid_ids_unique() {
        let mut ids = UuidIds;
        let generated: HashSet<String> = (0..1000).map(|_| ids.new_id()).collect();
        assert_eq!(generated.len(), 1000);
    }

    #[test]
    fn test_uuid_ids_are_v7() {
        let id = UuidIds.new_id();
        let parsed = Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn test_sequential_ids() {
        let mut ids = SequentialIds::new("t");
        assert_eq!(ids.new_id(), "t1");
        assert_eq!(ids.new_id(), "t2");
        assert_eq!(SequentialIds::default().new_id(), "task-1");
    }
}
