// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::errors::TaskError;
use crate::exec::{ExecutorEvent, ExecutorPayload, StartMessage};
use crate::scheduler::{Scheduler, SchedulerStep};
use crate::task::{TaskId, TaskKind, TaskRecord};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreCommand {
    /// Ask the executor of a running task to terminate.
    Terminate(TaskId),
    /// Write this record to the durable store.
    Persist(TaskRecord),
    /// Start an executor for this task.
    Start(StartMessage),
    /// Delete every record from the durable store.
    ClearStore,
}

/// Decision returned by the core after handling a single `TaskEvent`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoreStep {
    /// Task created by this event (submit / retry).
    pub created: Option<TaskId>,
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
}

impl From<SchedulerStep> for CoreStep {
    /// Terminations first, then persistence, then starts, so every status
    /// change is on its way to the store before an executor is spawned.
    fn from(step: SchedulerStep) -> Self {
        let mut commands = Vec::with_capacity(
            step.to_terminate.len() + step.changed.len() + step.newly_dispatched.len(),
        );
        commands.extend(step.to_terminate.into_iter().map(CoreCommand::Terminate));
        commands.extend(step.changed.into_iter().map(CoreCommand::Persist));
        commands.extend(step.newly_dispatched.into_iter().map(CoreCommand::Start));

        CoreStep {
            created: step.created,
            commands,
        }
    }
}

/// Handle a submission.
pub fn handle_submission(
    scheduler: &mut Scheduler,
    id: TaskId,
    kind: TaskKind,
    input: Value,
    submitted_at: DateTime<Utc>,
) -> Result<CoreStep, TaskError> {
    scheduler
        .handle_submit(id, kind, input, submitted_at)
        .map(CoreStep::from)
}

/// Handle a retry request: a new submission with the original kind/input.
pub fn handle_retry(
    scheduler: &mut Scheduler,
    original: &TaskId,
    id: TaskId,
    submitted_at: DateTime<Utc>,
) -> Result<CoreStep, TaskError> {
    scheduler
        .handle_retry(original, id, submitted_at)
        .map(CoreStep::from)
}

/// Handle a cancel request.
pub fn handle_cancel(scheduler: &mut Scheduler, id: &TaskId) -> Result<CoreStep, TaskError> {
    scheduler.handle_cancel(id).map(CoreStep::from)
}

/// Handle an inbound executor message.
pub fn handle_executor_event(
    scheduler: &mut Scheduler,
    event: ExecutorEvent,
) -> Result<CoreStep, TaskError> {
    let ExecutorEvent { id, payload } = event;

    let step = match payload {
        ExecutorPayload::Progress { progress } => scheduler.handle_progress(&id, progress)?,
        ExecutorPayload::Success { result } => scheduler.handle_success(&id, result)?,
        ExecutorPayload::Failure { error } => scheduler.handle_failure(&id, error)?,
    };

    Ok(step.into())
}

/// Handle a rehydrated record.
pub fn handle_rehydrated(scheduler: &mut Scheduler, record: TaskRecord) -> CoreStep {
    scheduler.handle_rehydrated(record).into()
}

/// Handle a clear-all request. The registry is left as it is.
pub fn handle_clear() -> CoreStep {
    CoreStep {
        created: None,
        commands: vec![CoreCommand::ClearStore],
    }
}
