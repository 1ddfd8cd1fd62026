//! A batch: fixed task membership, its prompts and its state store

use crate::io::error::Result;
use crate::orchestration::store::{BatchSnapshot, StatusCounts, TaskStateStore};
use crate::orchestration::task::{Task, TaskId};
use std::sync::atomic::{AtomicBool, Ordering};

/// One generation run over a fixed, ordered set of tasks
///
/// Membership is frozen at construction. A reset discards the whole batch
/// rather than editing it.
#[derive(Debug)]
pub struct Batch {
    generation: u64,
    tasks: Vec<Task>,
    store: TaskStateStore,
    dispatched: AtomicBool,
}

impl Batch {
    /// Create a batch with every task `Pending`
    ///
    /// # Errors
    ///
    /// Returns `DuplicateTask` if two tasks share an id
    pub fn new(generation: u64, tasks: Vec<Task>) -> Result<Self> {
        let store = TaskStateStore::new(tasks.iter().map(|task| task.id.clone()))?;
        Ok(Self {
            generation,
            tasks,
            store,
            dispatched: AtomicBool::new(false),
        })
    }

    /// Generation number the owning session assigned to this batch
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Tasks in submission order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Task ids in submission order
    pub fn ids(&self) -> &[TaskId] {
        self.store.ids()
    }

    /// Prompt of one task
    pub fn prompt(&self, id: &TaskId) -> Option<&str> {
        self.tasks
            .iter()
            .find(|task| &task.id == id)
            .map(|task| task.prompt.as_str())
    }

    /// Number of tasks in the batch
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the batch has no tasks
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// State store owned by this batch
    pub const fn store(&self) -> &TaskStateStore {
        &self.store
    }

    /// Tally of the batch's tasks by status
    pub fn counts(&self) -> StatusCounts {
        self.store.counts()
    }

    /// Whether every task reached `Done` or `Error`
    pub fn is_complete(&self) -> bool {
        self.store.is_complete()
    }

    /// Mark the batch as handed to a worker pool
    ///
    /// Returns `false` if it was already dispatched; each batch runs once.
    pub fn begin_dispatch(&self) -> bool {
        !self.dispatched.swap(true, Ordering::AcqRel)
    }

    /// Whether the batch has been handed to a worker pool
    pub fn is_dispatched(&self) -> bool {
        self.dispatched.load(Ordering::Acquire)
    }

    /// Whether the batch was dispatched and still has pending tasks
    pub fn is_running(&self) -> bool {
        self.is_dispatched() && !self.is_complete()
    }

    /// Read-only copy of every task's state
    pub fn snapshot(&self) -> BatchSnapshot {
        self.store.snapshot(self.generation)
    }
}
