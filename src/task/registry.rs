// src/task/registry.rs

//! Authoritative in-memory view of all known tasks.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, trace};

use crate::errors::TaskError;
use crate::task::model::{Task, TaskId, TaskStatus};
use crate::task::state::{self, Step, Transition};

/// Observable effect of applying a [`Transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    StatusChanged { from: TaskStatus, to: TaskStatus },
    ProgressUpdated(u8),
    Unchanged,
}

/// Task map plus the ordered pending queue and running set.
///
/// A task submitted in this process is a member of exactly one list while it
/// is `queued` or `running`, and of neither once terminal. Tasks stored via
/// [`TaskRegistry::upsert`] are detached: they belong to no list whatever
/// their status, so they never occupy a slot and are never dispatched.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<TaskId, Task>,
    pending: VecDeque<TaskId>,
    running: Vec<TaskId>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a task record. Last write wins.
    pub fn upsert(&mut self, task: Task) {
        self.detach(&task.id);
        trace!(task = %task.id, status = %task.status, "registry upsert");
        self.tasks.insert(task.id, task);
    }

    /// Store a newly submitted task and append it to the pending queue tail.
    pub fn submit(&mut self, task: Task) {
        let id = task.id;
        self.detach(&id);
        self.tasks.insert(id, Task { status: TaskStatus::Queued, progress: 0, ..task });
        self.pending.push_back(id);
        debug!(task = %id, pending = self.pending.len(), "task appended to pending queue");
    }

    /// Apply one state-machine event to the task `id`.
    pub fn transition(
        &mut self,
        id: &TaskId,
        event: Transition,
    ) -> Result<TransitionEffect, TaskError> {
        let from = self
            .tasks
            .get(id)
            .map(|task| task.status)
            .ok_or(TaskError::UnknownTask(*id))?;

        let invalid = |event: &Transition| TaskError::InvalidTransition {
            id: *id,
            status: from,
            event: event.name(),
        };

        let to = match state::step(from, &event) {
            Step::To(to) => to,
            Step::Ignore => return Ok(TransitionEffect::Unchanged),
            Step::Reject => return Err(invalid(&event)),
        };

        if matches!(event, Transition::Dispatch) && !self.pending.contains(id) {
            // Detached queued records are visible but never dispatched.
            return Err(invalid(&event));
        }

        let Some(task) = self.tasks.get_mut(id) else {
            return Err(TaskError::UnknownTask(*id));
        };

        match event {
            Transition::Dispatch => {
                task.status = TaskStatus::Running;
                task.progress = 0;
                self.pending.retain(|p| p != id);
                self.running.push(*id);
            }
            Transition::Progress(reported) => {
                let next = state::fold_progress(task.progress, reported);
                if next == task.progress {
                    return Ok(TransitionEffect::Unchanged);
                }
                task.progress = next;
                return Ok(TransitionEffect::ProgressUpdated(next));
            }
            Transition::Succeed(result) => {
                task.status = TaskStatus::Success;
                task.progress = 100;
                task.result = Some(result);
                task.error = None;
                self.running.retain(|r| r != id);
            }
            Transition::Fail(error) => {
                task.status = TaskStatus::Failure;
                task.error = Some(error);
                task.result = None;
                self.running.retain(|r| r != id);
            }
            Transition::Cancel => {
                task.status = TaskStatus::Cancelled;
                task.result = None;
                task.error = None;
                self.pending.retain(|p| p != id);
                self.running.retain(|r| r != id);
            }
        }

        debug_assert_eq!(task.status, to);
        Ok(TransitionEffect::StatusChanged { from, to })
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn pending_head(&self) -> Option<TaskId> {
        self.pending.front().copied()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn running_len(&self) -> usize {
        self.running.len()
    }

    pub fn is_pending(&self, id: &TaskId) -> bool {
        self.pending.contains(id)
    }

    pub fn is_running(&self, id: &TaskId) -> bool {
        self.running.contains(id)
    }

    /// Immutable copy of the current state.
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            tasks: self.tasks.clone(),
            pending: self.pending.iter().copied().collect(),
            running: self.running.clone(),
        }
    }

    fn detach(&mut self, id: &TaskId) {
        self.pending.retain(|p| p != id);
        self.running.retain(|r| r != id);
    }
}

/// Point-in-time view handed to consumers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskSnapshot {
    tasks: HashMap<TaskId, Task>,
    pending: Vec<TaskId>,
    running: Vec<TaskId>,
}

impl TaskSnapshot {
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Pending ids, head first.
    pub fn pending(&self) -> &[TaskId] {
        &self.pending
    }

    /// Running ids in dispatch order.
    pub fn running(&self) -> &[TaskId] {
        &self.running
    }

    /// All tasks ordered by submission time.
    pub fn tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.values().collect();
        tasks.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)));
        tasks
    }

    /// No pending and no running work.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.running.is_empty()
    }
}
