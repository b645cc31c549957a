// src/scheduler/step.rs

//! Result type for scheduler steps.

use crate::exec::StartMessage;
use crate::task::{TaskId, TaskRecord};

/// Structured result of a single scheduler "step".
///
/// The caller turns this into side effects: start executors, stop executors,
/// persist records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerStep {
    /// Id of the task created by this step (submit / retry).
    pub created: Option<TaskId>,
    /// Records whose status changed in this step, in the order the changes
    /// happened.
    pub changed: Vec<TaskRecord>,
    /// Tasks that moved from pending to running, head of queue first.
    pub newly_dispatched: Vec<StartMessage>,
    /// Running tasks whose executors must be terminated.
    pub to_terminate: Vec<TaskId>,
}

impl SchedulerStep {
    pub fn is_empty(&self) -> bool {
        self.created.is_none()
            && self.changed.is_empty()
            && self.newly_dispatched.is_empty()
            && self.to_terminate.is_empty()
    }
}
