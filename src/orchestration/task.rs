//! Task identity and the per-task state machine

use crate::generation::client::ImageBytes;
use crate::io::error::{MultiverseError, Result};
use std::fmt;
use std::sync::Arc;

/// Opaque task identifier, unique within one batch
///
/// Cheap to clone; the same id is shared by the queue, the store and reports.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(Arc<str>);

impl TaskId {
    /// Create an id from any string-like value
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Borrow the id as text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

/// One unit of work: an id and the prompt fixed at submission time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Identifier of the task within its batch
    pub id: TaskId,
    /// Prompt sent to the generation client
    pub prompt: String,
}

impl Task {
    /// Create a task from an id and its prompt
    pub fn new(id: impl Into<TaskId>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
        }
    }
}

/// Payload-free task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Not finished yet
    Pending,
    /// Generated successfully
    Done,
    /// Generation failed
    Error,
}

impl TaskStatus {
    /// Whether no further transition is possible
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Current state of a task
///
/// The result image exists only in `Done` and the message only in `Error`,
/// so the payload always matches the status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting in the queue or in flight
    #[default]
    Pending,
    /// Finished with a generated image
    Done(ImageBytes),
    /// Finished with a human-readable failure message
    Error(String),
}

impl TaskState {
    /// Build an error state, substituting a generic message for blank input
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self::Error("generation failed without a message".to_string())
        } else {
            Self::Error(message)
        }
    }

    /// Status discriminant of this state
    pub const fn status(&self) -> TaskStatus {
        match self {
            Self::Pending => TaskStatus::Pending,
            Self::Done(_) => TaskStatus::Done,
            Self::Error(_) => TaskStatus::Error,
        }
    }

    /// Whether the state is `Done` or `Error`
    pub const fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Generated image, present iff `Done`
    pub const fn result(&self) -> Option<&ImageBytes> {
        match self {
            Self::Done(image) => Some(image),
            _ => None,
        }
    }

    /// Failure message, present iff `Error`
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Check that moving from `self` to `next` is a legal transition
    ///
    /// Only `Pending → Done` and `Pending → Error` are allowed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` when `self` is terminal or `next` is `Pending`
    pub fn check_transition(&self, task: &TaskId, next: &Self) -> Result<()> {
        if self.is_terminal() || !next.is_terminal() {
            return Err(MultiverseError::InvalidTransition {
                task: task.clone(),
                from: self.status(),
                to: next.status(),
            });
        }
        Ok(())
    }
}
