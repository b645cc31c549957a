// src/engine/mod.rs

//! Orchestration engine for taskrunner.
//!
//! This module ties together:
//! - the scheduler (task registry, state machine, FIFO dispatch)
//! - the executor gateway
//! - the persistence sink
//! - the main runtime event loop that reacts to:
//!   - submissions, retries and cancellations from clients
//!   - progress and terminal events from executors
//!   - clear-all and shutdown requests
//!
//! The pure core state machine lives in [`core`]; the async/IO shell (the
//! single-writer event bus) is implemented in [`runtime`]. [`client`] is the
//! handle consumers use, [`rehydrator`] restores persisted state at start-up
//! and [`service`] wires everything together.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::errors::TaskError;
use crate::exec::ExecutorEvent;
use crate::task::{TaskId, TaskKind, TaskRecord};

/// Events consumed by the pure core.
///
/// Ids and timestamps are decided by the caller, so the core stays
/// deterministic.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    Submitted {
        id: TaskId,
        kind: TaskKind,
        input: Value,
        submitted_at: DateTime<Utc>,
    },
    RetryRequested {
        original: TaskId,
        id: TaskId,
        submitted_at: DateTime<Utc>,
    },
    CancelRequested {
        id: TaskId,
    },
    /// Inbound message from an executor.
    Executor(ExecutorEvent),
    /// A record restored from the durable store at start-up.
    Rehydrated(TaskRecord),
    /// Purge the durable store; in-memory state is untouched.
    ClearRequested,
}

/// Reply channel for requests that create a task.
pub type CreatedReply = oneshot::Sender<Result<TaskId, TaskError>>;

/// Messages flowing into the runtime from clients and executors.
#[derive(Debug)]
pub enum RuntimeEvent {
    Submit {
        kind: TaskKind,
        input: Value,
        reply: CreatedReply,
    },
    Retry {
        id: TaskId,
        reply: CreatedReply,
    },
    Cancel {
        id: TaskId,
    },
    ClearAll,
    /// Acknowledge once all persistence issued so far has been applied.
    Flush {
        reply: oneshot::Sender<()>,
    },
    /// A supervised executor reported progress or an outcome.
    Executor(ExecutorEvent),
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod client;
pub mod core;
pub mod event_handlers;
pub mod rehydrator;
pub mod runtime;
pub mod service;

pub use client::TaskClient;
pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use rehydrator::{RehydrationReport, Rehydrator};
pub use runtime::Runtime;
pub use service::{ServiceOptions, TaskService};
