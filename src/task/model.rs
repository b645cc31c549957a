// src/task/model.rs

//! Core task data types and the persisted record schema.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::TaskError;

/// Highest progress value a running task may report.
///
/// 100 is reserved for `success`, so observers can treat `progress == 100`
/// and `status == success` as equivalent.
pub const MAX_RUNNING_PROGRESS: u8 = 99;

/// Opaque, globally unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        TaskId(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(TaskId)
    }
}

/// Closed set of task types. Each variant selects one executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    Example,
    PasswordHash,
    TextSummarization,
    ImageToGreyscale,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Example,
        TaskKind::PasswordHash,
        TaskKind::TextSummarization,
        TaskKind::ImageToGreyscale,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Example => "example",
            TaskKind::PasswordHash => "password-hash",
            TaskKind::TextSummarization => "text-summarization",
            TaskKind::ImageToGreyscale => "image-to-greyscale",
        }
    }

    /// Whether a non-terminal record of this kind may be shown again after a
    /// restart.
    ///
    /// Image payloads are not kept in a re-derivable form, so an unfinished
    /// greyscale task would only ever show up as a stuck entry.
    pub fn payload_resumable(&self) -> bool {
        !matches!(self, TaskKind::ImageToGreyscale)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| TaskError::UnknownKind(s.trim().to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Success,
    Failure,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Failure | TaskStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Failure => "failure",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// In-memory view of a task.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    pub input: Value,
    pub status: TaskStatus,
    /// Percentage in `0..=100`.
    pub progress: u8,
    /// Set only when `status == Success`.
    pub result: Option<Value>,
    /// Set only when `status == Failure`.
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl Task {
    /// A freshly submitted task in `queued` state.
    pub fn queued(id: TaskId, kind: TaskKind, input: Value, submitted_at: DateTime<Utc>) -> Self {
        Self {
            id,
            kind,
            input,
            status: TaskStatus::Queued,
            progress: 0,
            result: None,
            error: None,
            submitted_at,
        }
    }

    /// Rebuild a task from its persisted record.
    ///
    /// Progress is not persisted; it is derived from the status.
    pub fn from_record(record: TaskRecord) -> Self {
        let progress = if record.status == TaskStatus::Success {
            100
        } else {
            0
        };
        Self {
            id: record.id,
            kind: record.kind,
            input: record.input,
            status: record.status,
            progress,
            result: record.result,
            error: record.error,
            submitted_at: record.submitted_at,
        }
    }

    pub fn to_record(&self) -> TaskRecord {
        TaskRecord {
            id: self.id,
            kind: self.kind,
            input: self.input.clone(),
            status: self.status,
            result: self.result.clone(),
            error: self.error.clone(),
            submitted_at: self.submitted_at,
        }
    }
}

/// Durable representation of a task, one per id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: TaskId,
    pub kind: TaskKind,
    pub input: Value,
    pub status: TaskStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
}
