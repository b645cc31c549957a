// src/exec/gateway.rs

//! The gateway between the runtime and executors.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::RuntimeEvent;
use crate::errors::TaskError;
use crate::exec::backend::{ExecutionContext, ExecutorRegistry};
use crate::exec::protocol::StartMessage;
use crate::exec::supervisor::Supervisor;
use crate::task::{TaskId, TaskKind};

/// Handle for one started execution, used to cancel it.
///
/// Dropping the handle also cancels the execution.
pub struct ExecutionHandle {
    id: TaskId,
    cancel: Option<oneshot::Sender<()>>,
    supervisor: JoinHandle<()>,
}

impl fmt::Debug for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionHandle")
            .field("id", &self.id)
            .field("cancel_sent", &self.cancel.is_none())
            .field("finished", &self.supervisor.is_finished())
            .finish()
    }
}

/// Maps task kinds to executors and spawns supervised executions.
pub struct ExecutorGateway {
    executors: ExecutorRegistry,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    cancel_grace: Duration,
}

impl fmt::Debug for ExecutorGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorGateway")
            .field("executors", &self.executors)
            .field("cancel_grace", &self.cancel_grace)
            .finish_non_exhaustive()
    }
}

impl ExecutorGateway {
    pub fn new(
        executors: ExecutorRegistry,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        cancel_grace: Duration,
    ) -> Self {
        Self {
            executors,
            runtime_tx,
            cancel_grace,
        }
    }

    /// Kinds with a registered executor.
    pub fn kinds(&self) -> BTreeSet<TaskKind> {
        self.executors.kinds()
    }

    /// Begin executing `start` in its own Tokio task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, start: StartMessage) -> Result<ExecutionHandle, TaskError> {
        let executor = self.executors.get(start.kind)?;
        let id = start.id;
        let kind = start.kind;

        let (ctx, events, control) = ExecutionContext::channel(start);
        let worker = tokio::spawn(executor.execute(ctx));

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let supervisor = Supervisor {
            id,
            worker,
            events,
            control,
            cancel_rx,
            runtime_tx: self.runtime_tx.clone(),
            grace: self.cancel_grace,
        };
        let supervisor = tokio::spawn(supervisor.run());

        info!(task = %id, %kind, "executor started");

        Ok(ExecutionHandle {
            id,
            cancel: Some(cancel_tx),
            supervisor,
        })
    }

    /// Request termination of an execution. Idempotent.
    pub fn cancel(&self, handle: &mut ExecutionHandle) {
        match handle.cancel.take() {
            Some(cancel) => {
                if cancel.send(()).is_err() {
                    debug!(task = %handle.id, "execution already finished while cancelling");
                } else {
                    info!(task = %handle.id, "cancel requested for running execution");
                }
            }
            None => {
                debug!(task = %handle.id, "execution already cancelled");
            }
        }
    }
}
