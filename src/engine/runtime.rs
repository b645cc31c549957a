// src/engine/runtime.rs

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::errors::{Result, TaskError};
use crate::exec::{ExecutionHandle, ExecutorEvent, ExecutorGateway};
use crate::store::PersistenceSink;
use crate::task::{TaskId, TaskSnapshot};

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent, TaskEvent};

/// The event bus.
///
/// Every mutation of task state happens here, one event at a time, in the
/// order events arrive on `event_rx`. The semantics live in `CoreRuntime`;
/// this struct does the IO: starting and cancelling executions, handing
/// records to the persistence sink and publishing snapshots.
///
/// Per event the order is: apply, execute commands (persistence first),
/// publish the snapshot, then reply to the caller.
pub struct Runtime {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    gateway: ExecutorGateway,
    sink: PersistenceSink,
    snapshots: watch::Sender<Arc<TaskSnapshot>>,
    executions: HashMap<TaskId, ExecutionHandle>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("executions", &self.executions.len())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        gateway: ExecutorGateway,
        sink: PersistenceSink,
        snapshots: watch::Sender<Arc<TaskSnapshot>>,
    ) -> Self {
        Self {
            core,
            event_rx,
            gateway,
            sink,
            snapshots,
            executions: HashMap::new(),
        }
    }

    /// Main event loop.
    ///
    /// Runs until a `ShutdownRequested` event arrives or every sender is
    /// gone. On exit all live executions are cancelled.
    pub async fn run(mut self) -> Result<()> {
        info!(
            max_concurrency = self.core.scheduler().max_concurrency(),
            tasks = self.core.scheduler().registry().len(),
            "taskrunner runtime started"
        );
        self.publish();

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            match event {
                RuntimeEvent::Submit { kind, input, reply } => {
                    let id = TaskId::new();
                    let outcome = self
                        .apply(TaskEvent::Submitted {
                            id,
                            kind,
                            input,
                            submitted_at: Utc::now(),
                        })
                        .map(|created| created.unwrap_or(id));
                    if let Err(err) = &outcome {
                        warn!(%kind, error = %err, "submission rejected");
                    }
                    let _ = reply.send(outcome);
                }
                RuntimeEvent::Retry { id: original, reply } => {
                    let id = TaskId::new();
                    let outcome = self
                        .apply(TaskEvent::RetryRequested {
                            original,
                            id,
                            submitted_at: Utc::now(),
                        })
                        .map(|created| created.unwrap_or(id));
                    if let Err(err) = &outcome {
                        warn!(task = %original, error = %err, "retry rejected");
                    }
                    let _ = reply.send(outcome);
                }
                RuntimeEvent::Cancel { id } => {
                    if let Err(err) = self.apply(TaskEvent::CancelRequested { id }) {
                        warn!(task = %id, error = %err, "cancel discarded");
                    }
                }
                RuntimeEvent::ClearAll => {
                    if let Err(err) = self.apply(TaskEvent::ClearRequested) {
                        warn!(error = %err, "clear discarded");
                    }
                }
                RuntimeEvent::Flush { reply } => {
                    self.sink.flush_with(reply);
                }
                RuntimeEvent::Executor(event) => {
                    self.on_executor_event(event);
                }
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested; stopping runtime");
                    break;
                }
            }
        }

        self.shutdown();
        info!("runtime exiting");
        Ok(())
    }

    fn on_executor_event(&mut self, event: ExecutorEvent) {
        let id = event.id;
        let terminal = event.is_terminal();

        if let Err(err) = self.apply(TaskEvent::Executor(event)) {
            // Late messages for tasks that were cancelled in the meantime
            // end up here.
            debug!(task = %id, error = %err, "executor event discarded");
        }

        if terminal {
            self.executions.remove(&id);
        }
    }

    /// Feed one event through the core, execute the resulting commands and
    /// publish the new snapshot.
    ///
    /// Executions that fail to start are reported back into the core as
    /// failures within the same turn.
    fn apply(&mut self, event: TaskEvent) -> std::result::Result<Option<TaskId>, TaskError> {
        let step = self.core.step(event)?;
        let created = step.created;

        let mut follow_ups = self.execute(step.commands);
        while let Some(event) = follow_ups.pop_front() {
            match self.core.step(event) {
                Ok(step) => follow_ups.extend(self.execute(step.commands)),
                Err(err) => warn!(error = %err, "follow-up event rejected"),
            }
        }

        self.publish();
        Ok(created)
    }

    fn execute(&mut self, commands: Vec<CoreCommand>) -> VecDeque<TaskEvent> {
        let mut follow_ups = VecDeque::new();

        for command in commands {
            match command {
                CoreCommand::Terminate(id) => match self.executions.remove(&id) {
                    Some(mut handle) => self.gateway.cancel(&mut handle),
                    None => debug!(task = %id, "no live execution to terminate"),
                },
                CoreCommand::Persist(record) => self.sink.put(record),
                CoreCommand::Start(start) => {
                    let id = start.id;
                    match self.gateway.start(start) {
                        Ok(handle) => {
                            self.executions.insert(id, handle);
                        }
                        Err(err) => {
                            let failure = TaskError::ExecutorFailure(err.to_string());
                            warn!(task = %id, error = %failure, "executor could not be started");
                            follow_ups.push_back(TaskEvent::Executor(ExecutorEvent::failure(
                                id,
                                failure.failure_message(),
                            )));
                        }
                    }
                }
                CoreCommand::ClearStore => self.sink.clear(),
            }
        }

        follow_ups
    }

    fn publish(&self) {
        self.snapshots.send_replace(Arc::new(self.core.snapshot()));
    }

    fn shutdown(&mut self) {
        if self.executions.is_empty() {
            return;
        }
        info!(live = self.executions.len(), "cancelling live executions");
        for (_, mut handle) in self.executions.drain() {
            self.gateway.cancel(&mut handle);
        }
    }
}
