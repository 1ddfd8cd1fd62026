//! Error types for batch orchestration, album composition and file output

use crate::orchestration::task::{TaskId, TaskStatus};
use std::fmt;
use std::path::PathBuf;

/// Main error type for all batch and album operations
///
/// Per-task generation failures are not represented here: they are captured
/// into the task's state and never abort the batch.
#[derive(Debug)]
pub enum MultiverseError {
    /// Album requested before every task in the batch finished successfully
    IncompleteAlbumRequest {
        /// Number of tasks the batch contains
        expected: usize,
        /// Number of tasks with a generated image
        done: usize,
        /// Tasks without an image, in batch order
        missing: Vec<TaskId>,
    },

    /// Rendering the album grid failed
    CompositionFailure {
        /// Task whose image caused the failure, if any
        task: Option<TaskId>,
        /// Description of the failure
        reason: String,
    },

    /// Operation needs a batch but none is active
    NoActiveBatch,

    /// A new batch was requested while the active one is still running
    BatchInProgress {
        /// Generation number of the running batch
        generation: u64,
        /// Tasks of that batch not yet terminal
        pending: usize,
    },

    /// The batch was already handed to a worker pool
    BatchAlreadyDispatched {
        /// Generation number of the batch
        generation: u64,
    },

    /// The same task id was submitted twice in one batch
    DuplicateTask {
        /// The repeated id
        task: TaskId,
    },

    /// Task id is not a member of the batch
    UnknownTask {
        /// The unknown id
        task: TaskId,
    },

    /// Attempted to move a task out of a terminal state
    InvalidTransition {
        /// Task being updated
        task: TaskId,
        /// Status the task currently holds
        from: TaskStatus,
        /// Status that was requested
        to: TaskStatus,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Failed to read or decode the source image
    ImageLoad {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image decoding error
        source: image::ImageError,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl fmt::Display for MultiverseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompleteAlbumRequest {
                expected,
                done,
                missing,
            } => {
                write!(
                    f,
                    "Album needs all {expected} universes done, but only {done} are"
                )?;
                if !missing.is_empty() {
                    let names: Vec<&str> = missing.iter().map(TaskId::as_str).collect();
                    write!(f, " (missing: {})", names.join(", "))?;
                }
                Ok(())
            }
            Self::CompositionFailure {
                task: Some(task),
                reason,
            } => {
                write!(f, "Album composition failed on '{task}': {reason}")
            }
            Self::CompositionFailure { task: None, reason } => {
                write!(f, "Album composition failed: {reason}")
            }
            Self::NoActiveBatch => write!(f, "No active batch"),
            Self::BatchInProgress {
                generation,
                pending,
            } => {
                write!(
                    f,
                    "Batch {generation} is still running ({pending} tasks pending)"
                )
            }
            Self::BatchAlreadyDispatched { generation } => {
                write!(f, "Batch {generation} has already been dispatched")
            }
            Self::DuplicateTask { task } => {
                write!(f, "Task '{task}' appears more than once in the batch")
            }
            Self::UnknownTask { task } => {
                write!(f, "Task '{task}' is not part of the batch")
            }
            Self::InvalidTransition { task, from, to } => {
                write!(f, "Task '{task}' cannot move from {from} to {to}")
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::ImageLoad { path, source } => {
                write!(f, "Failed to load image '{}': {source}", path.display())
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for MultiverseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageLoad { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for crate results
pub type Result<T> = std::result::Result<T, MultiverseError>;

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> MultiverseError {
    MultiverseError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a composition error, optionally attributed to one task
pub fn composition_failure(task: Option<&TaskId>, reason: &impl ToString) -> MultiverseError {
    MultiverseError::CompositionFailure {
        task: task.cloned(),
        reason: reason.to_string(),
    }
}

/// Wrap an I/O error with the path and operation it came from
pub fn file_system(
    path: impl Into<PathBuf>,
    operation: &'static str,
) -> impl FnOnce(std::io::Error) -> MultiverseError {
    let path = path.into();
    move |source| MultiverseError::FileSystem {
        path,
        operation,
        source,
    }
}
