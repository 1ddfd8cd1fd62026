//! Thread-safe FIFO queue of tasks waiting to start

use crate::orchestration::task::Task;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Shared queue drained by the worker pool
///
/// Every task is enqueued before the workers start, so consumers never wait
/// for new work: an empty queue means the worker is finished.
#[derive(Debug, Default)]
pub struct TaskQueue {
    inner: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    /// Create a queue holding `tasks` in their given order
    pub fn new(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self {
            inner: Mutex::new(tasks.into_iter().collect()),
        }
    }

    /// Append a task at the back
    pub fn push(&self, task: Task) {
        self.lock().push_back(task);
    }

    /// Take the oldest task, if any remain
    pub fn pop(&self) -> Option<Task> {
        self.lock().pop_front()
    }

    /// Number of tasks not yet taken
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether every task has been taken
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every remaining task, returning how many were dropped
    pub fn clear(&self) -> usize {
        let mut queue = self.lock();
        let dropped = queue.len();
        queue.clear();
        dropped
    }

    // The queue holds plain data, so a panic while locked cannot leave it
    // half-updated; recover the guard instead of propagating the poison.
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Task>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
