// src/errors.rs

//! Crate-wide error types.
//!
//! - [`TaskError`] covers everything that can go wrong for a single task.
//!   These errors are always local to the task they name.
//! - [`PersistenceError`] is produced by the durable store.
//! - [`TaskRunnerError`] is the top-level error returned by the public API
//!   and the binary.

use std::path::PathBuf;

use thiserror::Error;

use crate::task::{TaskId, TaskStatus};

/// Error code used when an executor dies without reporting an outcome.
pub const EXECUTOR_CRASHED: &str = "executor terminated without a terminal event";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    #[error("no executor registered for task kind '{0}'")]
    UnknownKind(String),

    #[error("task {id}: event '{event}' is not valid while {status}")]
    InvalidTransition {
        id: TaskId,
        status: TaskStatus,
        event: &'static str,
    },

    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    #[error("executor failure: {0}")]
    ExecutorFailure(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl TaskError {
    /// Failure recorded for an execution that ended without an outcome.
    pub fn executor_crashed() -> Self {
        TaskError::ExecutorFailure(EXECUTOR_CRASHED.to_string())
    }

    /// Text stored on a task that failed because of this error.
    ///
    /// Executor failures keep the executor's own message.
    pub fn failure_message(&self) -> String {
        match self {
            TaskError::ExecutorFailure(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<PersistenceError> for TaskError {
    fn from(err: PersistenceError) -> Self {
        TaskError::Persistence(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("store I/O failed at {path:?}: {cause:#}")]
    Io { path: PathBuf, cause: anyhow::Error },

    #[error("record {key} could not be encoded or decoded: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("store lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum TaskRunnerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("task runtime is no longer running")]
    RuntimeClosed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskRunnerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_failures_keep_their_own_message() {
        let crash = TaskError::executor_crashed();
        assert_eq!(crash, TaskError::ExecutorFailure(EXECUTOR_CRASHED.to_string()));
        assert_eq!(crash.failure_message(), EXECUTOR_CRASHED);
        assert_eq!(crash.to_string(), format!("executor failure: {EXECUTOR_CRASHED}"));

        let other = TaskError::Persistence("disk full".to_string());
        assert_eq!(other.failure_message(), "persistence error: disk full");
    }
}
