// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`TaskEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - starting and cancelling executors through the gateway
//! - handing records to the persistence sink
//! - publishing snapshots
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or executors.

use crate::engine::TaskEvent;
use crate::engine::event_handlers::{
    CoreStep, handle_cancel, handle_clear, handle_executor_event, handle_rehydrated,
    handle_retry, handle_submission,
};
use crate::errors::TaskError;
use crate::scheduler::Scheduler;
use crate::task::TaskSnapshot;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Whether no task is pending or running.
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        self.scheduler.snapshot()
    }

    /// Handle a single event, updating core state and returning the
    /// resulting commands for the IO shell.
    ///
    /// An error means the event was rejected and nothing changed.
    pub fn step(&mut self, event: TaskEvent) -> Result<CoreStep, TaskError> {
        match event {
            TaskEvent::Submitted {
                id,
                kind,
                input,
                submitted_at,
            } => handle_submission(&mut self.scheduler, id, kind, input, submitted_at),
            TaskEvent::RetryRequested {
                original,
                id,
                submitted_at,
            } => handle_retry(&mut self.scheduler, &original, id, submitted_at),
            TaskEvent::CancelRequested { id } => handle_cancel(&mut self.scheduler, &id),
            TaskEvent::Executor(event) => handle_executor_event(&mut self.scheduler, event),
            TaskEvent::Rehydrated(record) => Ok(handle_rehydrated(&mut self.scheduler, record)),
            TaskEvent::ClearRequested => Ok(handle_clear()),
        }
    }
}
