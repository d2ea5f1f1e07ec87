// Task store: owns the collection, applies mutations, writes through to a backend

use crate::backend::Backend;
use crate::error::{BackendError, Result, StoreError};
use crate::filter::FilterMode;
use crate::ids::{IdGenerator, UuidIds};
use crate::record::Record;
use crate::task::{Task, TaskEdit, parse_deadline};
use crate::theme::Theme;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Immutable snapshot of the task sequence.
///
/// Cloning is cheap. The store copies on write, so a snapshot never
/// changes after it has been handed out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection(Arc<Vec<Task>>);

impl Collection {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self(Arc::new(tasks))
    }

    /// Ids in sequence order
    pub fn ids(&self) -> Vec<&str> {
        self.0.iter().map(|t| t.id()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.0.iter().find(|t| t.id() == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.0.iter().position(|t| t.id() == id)
    }

    /// Tasks passing `mode`, in sequence order, borrowed from the snapshot
    pub fn view(&self, mode: FilterMode) -> Vec<&Task> {
        self.0.iter().filter(|t| mode.matches(t)).collect()
    }

    /// Incomplete tasks whose deadline has passed
    pub fn overdue(&self, now: DateTime<Utc>) -> Vec<&Task> {
        self.0.iter().filter(|t| t.is_overdue(now)).collect()
    }

    fn tasks_mut(&mut self) -> &mut Vec<Task> {
        Arc::make_mut(&mut self.0)
    }
}

impl Deref for Collection {
    type Target = [Task];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Task>> for Collection {
    fn from(tasks: Vec<Task>) -> Self {
        Self::new(tasks)
    }
}

/// The fixed tasks installed when nothing has been persisted yet
pub fn seed_tasks() -> Vec<Task> {
    let deadline = |s: &str| parse_deadline(s).ok();
    vec![
        Task::new("1", "Buy groceries").with_deadline(deadline("2024-12-01T23:59:00")),
        Task::new("2", "Reboot computer").with_deadline(deadline("2024-12-10T23:59:00")),
        Task::new("3", "Ace interview")
            .with_completed(true)
            .with_deadline(deadline("2024-12-05T23:59:00")),
    ]
}

/// Parse a stored blob into tasks.
///
/// Records with an empty id, a blank label, or an id already seen are
/// dropped with a warning; the rest load in stored order.
pub fn decode_collection(key: &str, raw: &str) -> Result<Vec<Task>> {
    let tasks: Vec<Task> = serde_json::from_str(raw).map_err(|source| StoreError::PersistenceCorrupt {
        key: key.to_string(),
        source,
    })?;

    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(tasks.len());
    for (index, task) in tasks.into_iter().enumerate() {
        if task.id().is_empty() {
            warn!(key, index, "Dropped task with empty id");
            continue;
        }
        if task.label().trim().is_empty() {
            warn!(key, index, id = task.id(), "Dropped task with blank label");
            continue;
        }
        if !seen.insert(task.id().to_string()) {
            warn!(key, index, id = task.id(), "Dropped task with duplicate id");
            continue;
        }
        kept.push(task);
    }

    Ok(kept)
}

/// Authoritative owner of the task collection.
///
/// Every applied mutation is written through to the backend. A failed
/// write is returned as an error but the in-memory change stands.
pub struct Store<B: Backend, G: IdGenerator = UuidIds> {
    backend: B,
    ids: G,
    tasks: Collection,
    theme: Theme,
}

impl<B: Backend> Store<B, UuidIds> {
    /// Open with UUID v7 ids, falling back to the seed set on bad storage
    pub fn open_default(backend: B) -> Self {
        Self::open(backend, UuidIds)
    }
}

impl<B: Backend, G: IdGenerator> Store<B, G> {
    /// Build a store holding the seed set without touching the backend
    pub fn new(backend: B, ids: G) -> Self {
        Self {
            backend,
            ids,
            tasks: Collection::new(seed_tasks()),
            theme: Theme::default(),
        }
    }

    /// Build and initialize, never failing.
    ///
    /// Unreadable or corrupt storage is logged and the seed set is used.
    pub fn open(backend: B, ids: G) -> Self {
        let mut store = Self::new(backend, ids);
        if let Err(e) = store.initialize() {
            warn!(error = %e, "Failed to load tasks, using seed set");
        }
        store
    }

    /// Load the collection and theme from the backend.
    ///
    /// With nothing stored the seed set is installed. On failure the current
    /// collection (the seed set after `new`) is left in place and the error
    /// is returned.
    pub fn initialize(&mut self) -> Result<Collection> {
        let key = Task::storage_key();

        match Theme::load(&self.backend) {
            Ok(theme) => self.theme = theme,
            Err(e) => warn!(error = %e, "Failed to load theme, keeping default"),
        }

        match self.backend.load(key)? {
            Some(raw) => {
                let tasks = decode_collection(key, &raw)?;
                info!(count = tasks.len(), "Loaded tasks from storage");
                self.tasks = Collection::new(tasks);
            }
            None => {
                info!("No stored tasks, installing seed set");
                self.tasks = Collection::new(seed_tasks());
            }
        }

        Ok(self.collection())
    }

    /// Current snapshot
    pub fn collection(&self) -> Collection {
        self.tasks.clone()
    }

    /// Filtered view of the current collection; no mutation, no persistence
    pub fn view(&self, mode: FilterMode) -> Vec<&Task> {
        self.tasks.view(mode)
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Prepend a new incomplete task. A blank label is a no-op.
    pub fn add<I, S>(&mut self, label: &str, deadline: Option<DateTime<Utc>>, tags: I) -> Result<Collection>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if label.trim().is_empty() {
            debug!("add: blank label, ignoring");
            return Ok(self.collection());
        }

        let id = self.fresh_id();
        let task = Task::new(id.clone(), label).with_deadline(deadline).with_tags(tags);

        self.tasks.tasks_mut().insert(0, task);
        debug!(id = %id, "add: created task");

        self.persist()?;
        Ok(self.collection())
    }

    /// Set the completion state of `id` to exactly `completed`, apply `edit`,
    /// then move incomplete tasks ahead of completed ones (stable).
    ///
    /// Unknown ids are a no-op.
    pub fn set_completion(&mut self, id: &str, completed: bool, edit: TaskEdit) -> Result<Collection> {
        let Some(index) = self.tasks.position(id) else {
            debug!(id, "set_completion: unknown id, ignoring");
            return Ok(self.collection());
        };

        let tasks = self.tasks.tasks_mut();
        tasks[index].set_completed(completed);
        tasks[index].apply_edit(edit);

        // sort_by_key is stable: relative order inside each partition is kept
        tasks.sort_by_key(|t| t.is_completed());
        debug!(id, completed, "set_completion: updated task");

        self.persist()?;
        Ok(self.collection())
    }

    /// Delete `id`. Unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) -> Result<Collection> {
        let Some(index) = self.tasks.position(id) else {
            debug!(id, "remove: unknown id, ignoring");
            return Ok(self.collection());
        };

        self.tasks.tasks_mut().remove(index);
        debug!(id, "remove: deleted task");

        self.persist()?;
        Ok(self.collection())
    }

    /// Move the task at `from` so it ends up at `to`.
    ///
    /// Splice semantics: removal happens first, then insertion into the
    /// shortened sequence. No completion resort follows.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<Collection> {
        let len = self.tasks.len();
        for index in [from, to] {
            if index >= len {
                return Err(StoreError::IndexOutOfRange { index, len });
            }
        }

        if from != to {
            let tasks = self.tasks.tasks_mut();
            let task = tasks.remove(from);
            tasks.insert(to, task);
        }
        debug!(from, to, "reorder: moved task");

        self.persist()?;
        Ok(self.collection())
    }

    // ========================================================================
    // Theme preference
    // ========================================================================

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Set and persist the theme; the in-memory value changes even if the write fails
    pub fn set_theme(&mut self, theme: Theme) -> Result<Theme> {
        self.theme = theme;
        theme.save(&mut self.backend)?;
        Ok(theme)
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        self.set_theme(self.theme.toggled())
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    /// Ask the generator until it yields an id not already in use
    fn fresh_id(&mut self) -> String {
        loop {
            let id = self.ids.new_id();
            if self.tasks.get(&id).is_none() {
                return id;
            }
            warn!(id = %id, "Generated id already in use, retrying");
        }
    }

    fn persist(&mut self) -> Result<()> {
        let json = serde_json::to_string(&*self.tasks.0).map_err(BackendError::Encode)?;
        self.backend.save(Task::storage_key(), &json).map_err(|e| {
            warn!(error = %e, "Failed to persist tasks, keeping in-memory state");
            StoreError::from(e)
        })
    }
}
