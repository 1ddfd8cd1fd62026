//! Task state store with fixed membership and per-task atomic replace
//!
//! Membership is decided when the store is built and never changes, so the
//! map itself is immutable. Each entry is a `watch` channel: writers replace
//! one task's state atomically, and observers can subscribe to a single task
//! without touching any other entry.

use crate::generation::client::ImageBytes;
use crate::io::error::{MultiverseError, Result};
use crate::orchestration::task::{TaskId, TaskState, TaskStatus};
use std::collections::HashMap;
use tokio::sync::watch;

/// Number of tasks in each status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    /// Tasks not yet terminal
    pub pending: usize,
    /// Tasks that finished with an image
    pub done: usize,
    /// Tasks that finished with an error
    pub failed: usize,
}

impl StatusCounts {
    /// Total number of tasks counted
    pub const fn total(&self) -> usize {
        self.pending + self.done + self.failed
    }

    /// Whether every counted task is terminal
    pub const fn is_complete(&self) -> bool {
        self.pending == 0
    }
}

/// Read-only copy of every task's state, in batch order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSnapshot {
    /// Generation number of the batch the snapshot was taken from
    pub generation: u64,
    /// Task states in submission order
    pub tasks: Vec<(TaskId, TaskState)>,
}

impl BatchSnapshot {
    /// Tally the snapshot by status
    pub fn counts(&self) -> StatusCounts {
        tally(self.tasks.iter().map(|(_, state)| state.status()))
    }

    /// State of one task, if it belongs to the snapshot
    pub fn get(&self, id: &TaskId) -> Option<&TaskState> {
        self.tasks
            .iter()
            .find_map(|(task, state)| (task == id).then_some(state))
    }
}

/// Single source of truth for the state of every task in a batch
#[derive(Debug)]
pub struct TaskStateStore {
    order: Vec<TaskId>,
    slots: HashMap<TaskId, watch::Sender<TaskState>>,
}

impl TaskStateStore {
    /// Create a store with every id `Pending`
    ///
    /// # Errors
    ///
    /// Returns `DuplicateTask` if an id appears more than once
    pub fn new(ids: impl IntoIterator<Item = TaskId>) -> Result<Self> {
        let mut order = Vec::new();
        let mut slots = HashMap::new();

        for id in ids {
            if slots.contains_key(&id) {
                return Err(MultiverseError::DuplicateTask { task: id });
            }
            let (sender, _) = watch::channel(TaskState::Pending);
            slots.insert(id.clone(), sender);
            order.push(id);
        }

        Ok(Self { order, slots })
    }

    /// Task ids in submission order
    pub fn ids(&self) -> &[TaskId] {
        &self.order
    }

    /// Number of tasks in the store
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the store holds no tasks
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Current state of one task
    pub fn get(&self, id: &TaskId) -> Option<TaskState> {
        self.slots.get(id).map(|slot| slot.borrow().clone())
    }

    /// Current status of one task
    pub fn status(&self, id: &TaskId) -> Option<TaskStatus> {
        self.slots.get(id).map(|slot| slot.borrow().status())
    }

    /// Watch one task's state as it changes
    pub fn subscribe(&self, id: &TaskId) -> Option<watch::Receiver<TaskState>> {
        self.slots.get(id).map(watch::Sender::subscribe)
    }

    /// Replace one task's state with a terminal state
    ///
    /// The check and the write happen under that task's own lock only;
    /// other tasks are never blocked.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The id is not part of this store
    /// - The task is already terminal, or `next` is not terminal
    pub fn transition(&self, id: &TaskId, next: TaskState) -> Result<()> {
        let slot = self
            .slots
            .get(id)
            .ok_or_else(|| MultiverseError::UnknownTask { task: id.clone() })?;

        let mut rejected = None;
        slot.send_if_modified(|current| match current.check_transition(id, &next) {
            Ok(()) => {
                *current = next;
                true
            }
            Err(error) => {
                rejected = Some(error);
                false
            }
        });

        rejected.map_or(Ok(()), Err)
    }

    /// Record a successful generation
    ///
    /// # Errors
    ///
    /// See [`TaskStateStore::transition`]
    pub fn complete(&self, id: &TaskId, image: ImageBytes) -> Result<()> {
        self.transition(id, TaskState::Done(image))
    }

    /// Record a failed generation
    ///
    /// # Errors
    ///
    /// See [`TaskStateStore::transition`]
    pub fn fail(&self, id: &TaskId, message: impl Into<String>) -> Result<()> {
        self.transition(id, TaskState::failed(message))
    }

    /// Tally all tasks by status
    pub fn counts(&self) -> StatusCounts {
        tally(
            self.order
                .iter()
                .filter_map(|id| self.slots.get(id))
                .map(|slot| slot.borrow().status()),
        )
    }

    /// Whether every task is terminal
    pub fn is_complete(&self) -> bool {
        self.counts().is_complete()
    }

    /// Copy every task's state in submission order
    pub fn snapshot(&self, generation: u64) -> BatchSnapshot {
        let tasks = self
            .order
            .iter()
            .filter_map(|id| self.get(id).map(|state| (id.clone(), state)))
            .collect();
        BatchSnapshot { generation, tasks }
    }

    /// Images of the `Done` tasks in submission order
    pub fn done_images(&self) -> Vec<(TaskId, ImageBytes)> {
        self.order
            .iter()
            .filter_map(|id| {
                let state = self.get(id)?;
                state.result().map(|image| (id.clone(), image.clone()))
            })
            .collect()
    }
}

fn tally(statuses: impl Iterator<Item = TaskStatus>) -> StatusCounts {
    statuses.fold(StatusCounts::default(), |mut counts, status| {
        match status {
            TaskStatus::Pending => counts.pending += 1,
            TaskStatus::Done => counts.done += 1,
            TaskStatus::Error => counts.failed += 1,
        }
        counts
    })
}
