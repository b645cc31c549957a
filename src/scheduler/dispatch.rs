// src/scheduler/dispatch.rs

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::TaskError;
use crate::exec::StartMessage;
use crate::scheduler::step::SchedulerStep;
use crate::task::{
    Task, TaskId, TaskKind, TaskRecord, TaskRegistry, TaskSnapshot, TaskStatus, Transition,
    TransitionEffect,
};

/// Scheduler owns the task registry and the concurrency ceiling.
///
/// It is responsible for:
/// - accepting submissions (and retries, which are submissions too)
/// - applying executor events to the state machine
/// - cancelling pending or running tasks
/// - dispatching pending tasks in strict FIFO order while fewer than
///   `max_concurrency` tasks are running
///
/// Dispatch runs after every step that can add pending work or free a slot,
/// so no polling is needed.
#[derive(Debug)]
pub struct Scheduler {
    registry: TaskRegistry,
    max_concurrency: usize,
    kinds: BTreeSet<TaskKind>,
}

impl Scheduler {
    /// `max_concurrency` is clamped to at least 1.
    pub fn new(max_concurrency: usize, kinds: BTreeSet<TaskKind>) -> Self {
        Self {
            registry: TaskRegistry::new(),
            max_concurrency: max_concurrency.max(1),
            kinds,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        self.registry.snapshot()
    }

    /// Whether a submission of `kind` would be accepted.
    pub fn accepts(&self, kind: TaskKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// No pending and no running work.
    pub fn is_idle(&self) -> bool {
        self.registry.pending_len() == 0 && self.registry.running_len() == 0
    }

    /// Queue a new task and dispatch if a slot is free.
    pub fn handle_submit(
        &mut self,
        id: TaskId,
        kind: TaskKind,
        input: Value,
        submitted_at: DateTime<Utc>,
    ) -> Result<SchedulerStep, TaskError> {
        if !self.accepts(kind) {
            return Err(TaskError::UnknownKind(kind.to_string()));
        }

        let task = Task::queued(id, kind, input, submitted_at);
        let record = task.to_record();
        self.registry.submit(task);
        info!(task = %id, %kind, "task queued");

        let mut step = SchedulerStep {
            created: Some(id),
            changed: vec![record],
            ..SchedulerStep::default()
        };
        self.dispatch_into(&mut step);
        Ok(step)
    }

    /// Re-submit the kind and input of `original` as a brand-new task.
    ///
    /// The original task is left untouched. Live tasks (pending or running)
    /// cannot be retried.
    pub fn handle_retry(
        &mut self,
        original: &TaskId,
        new_id: TaskId,
        submitted_at: DateTime<Utc>,
    ) -> Result<SchedulerStep, TaskError> {
        let task = self
            .registry
            .get(original)
            .ok_or(TaskError::UnknownTask(*original))?;

        if self.registry.is_pending(original) || self.registry.is_running(original) {
            return Err(TaskError::InvalidTransition {
                id: *original,
                status: task.status,
                event: "retry",
            });
        }

        let (kind, input) = (task.kind, task.input.clone());
        debug!(original = %original, task = %new_id, "retrying task as new submission");
        self.handle_submit(new_id, kind, input, submitted_at)
    }

    pub fn handle_progress(&mut self, id: &TaskId, progress: f64) -> Result<SchedulerStep, TaskError> {
        match self.registry.transition(id, Transition::Progress(progress))? {
            TransitionEffect::ProgressUpdated(p) => debug!(task = %id, progress = p, "task progress"),
            _ => debug!(task = %id, reported = progress, "progress unchanged"),
        }
        Ok(SchedulerStep::default())
    }

    pub fn handle_success(&mut self, id: &TaskId, result: Value) -> Result<SchedulerStep, TaskError> {
        self.finish(id, Transition::Succeed(result))
    }

    pub fn handle_failure(&mut self, id: &TaskId, error: String) -> Result<SchedulerStep, TaskError> {
        self.finish(id, Transition::Fail(error))
    }

    /// Cancel a task.
    ///
    /// - pending: removed from the queue, no executor is ever contacted
    /// - running: marked cancelled now, its executor is listed in
    ///   `to_terminate`
    /// - terminal: no-op
    pub fn handle_cancel(&mut self, id: &TaskId) -> Result<SchedulerStep, TaskError> {
        let was_running = self.registry.is_running(id);
        let mut step = SchedulerStep::default();

        match self.registry.transition(id, Transition::Cancel)? {
            TransitionEffect::StatusChanged { from, .. } => {
                info!(task = %id, %from, "task cancelled");
                if was_running {
                    step.to_terminate.push(*id);
                }
                self.record_change(id, &mut step);
                self.dispatch_into(&mut step);
            }
            _ => debug!(task = %id, "cancel of terminal task ignored"),
        }

        Ok(step)
    }

    /// Restore a persisted record. Restores visibility only: the task is
    /// detached and nothing is dispatched or persisted.
    pub fn handle_rehydrated(&mut self, record: TaskRecord) -> SchedulerStep {
        debug!(task = %record.id, status = %record.status, kind = %record.kind, "task rehydrated");
        self.registry.upsert(Task::from_record(record));
        SchedulerStep::default()
    }

    fn finish(&mut self, id: &TaskId, transition: Transition) -> Result<SchedulerStep, TaskError> {
        let mut step = SchedulerStep::default();

        if let TransitionEffect::StatusChanged { to, .. } = self.registry.transition(id, transition)? {
            match to {
                TaskStatus::Failure => warn!(task = %id, "task failed"),
                _ => info!(task = %id, status = %to, "task finished"),
            }
            self.record_change(id, &mut step);
            self.dispatch_into(&mut step);
        }

        Ok(step)
    }

    fn record_change(&self, id: &TaskId, step: &mut SchedulerStep) {
        if let Some(task) = self.registry.get(id) {
            step.changed.push(task.to_record());
        }
    }

    /// Move pending tasks to running while slots are free.
    fn dispatch_into(&mut self, step: &mut SchedulerStep) {
        while self.registry.running_len() < self.max_concurrency {
            let Some(next) = self.registry.pending_head() else {
                break;
            };

            if let Err(err) = self.registry.transition(&next, Transition::Dispatch) {
                // Should not happen: the head of the queue is always queued.
                warn!(task = %next, error = %err, "could not dispatch pending task");
                break;
            }

            let Some(task) = self.registry.get(&next) else {
                break;
            };
            info!(
                task = %next,
                kind = %task.kind,
                running = self.registry.running_len(),
                max = self.max_concurrency,
                "dispatching task"
            );
            step.changed.push(task.to_record());
            step.newly_dispatched.push(StartMessage {
                id: task.id,
                kind: task.kind,
                input: task.input.clone(),
            });
        }

        debug_assert!(self.registry.running_len() <= self.max_concurrency);
    }
}
