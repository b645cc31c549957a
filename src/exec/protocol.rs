// src/exec/protocol.rs

//! Message contract between the gateway and executors.
//!
//! Outbound: `{ id, kind, input }` to start, `{ id, command: "cancel" }` to
//! stop. Inbound: `{ id, eventType: "progress" | "success" | "failure", .. }`.
//! Each started execution produces exactly one terminal inbound message.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::task::{TaskId, TaskKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartMessage {
    pub id: TaskId,
    pub kind: TaskKind,
    pub input: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub id: TaskId,
    pub command: Command,
}

impl ControlMessage {
    pub fn cancel(id: TaskId) -> Self {
        Self {
            id,
            command: Command::Cancel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "lowercase")]
pub enum ExecutorPayload {
    Progress { progress: f64 },
    Success { result: Value },
    Failure { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorEvent {
    pub id: TaskId,
    #[serde(flatten)]
    pub payload: ExecutorPayload,
}

impl ExecutorEvent {
    pub fn progress(id: TaskId, progress: f64) -> Self {
        Self {
            id,
            payload: ExecutorPayload::Progress { progress },
        }
    }

    pub fn success(id: TaskId, result: Value) -> Self {
        Self {
            id,
            payload: ExecutorPayload::Success { result },
        }
    }

    pub fn failure(id: TaskId, error: impl Into<String>) -> Self {
        Self {
            id,
            payload: ExecutorPayload::Failure {
                error: error.into(),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.payload, ExecutorPayload::Progress { .. })
    }
}
