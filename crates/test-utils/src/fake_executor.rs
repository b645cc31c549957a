use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Notify, mpsc};
use taskrunner::exec::{BoxFuture, CANCELLED_MESSAGE, ExecutionContext, Executor};
use taskrunner::task::{TaskId, TaskKind};

const POLL: Duration = Duration::from_millis(5);

/// What a controlled execution should do next.
#[derive(Debug, Clone)]
pub enum Script {
    Progress(f64),
    Succeed(Value),
    Fail(String),
    /// Return without a terminal event.
    Exit,
    /// Panic inside the executor task.
    Panic,
}

#[derive(Default)]
struct ControllerState {
    scripts: Mutex<HashMap<TaskId, mpsc::UnboundedSender<Script>>>,
    started: Mutex<Vec<TaskId>>,
    observed_cancel: Mutex<Vec<TaskId>>,
    changed: Notify,
}

/// Drives fake executors from the test body.
///
/// Every execution started through [`ExecutorController::executor`] records
/// its id and then waits for [`Script`] steps sent with the helper methods.
/// A cooperative executor answers a cancel request with the standard
/// cancellation failure; a stubborn one keeps waiting for its script.
#[derive(Clone, Default)]
pub struct ExecutorController {
    state: Arc<ControllerState>,
}

impl ExecutorController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor for `kind` that honours cancel requests.
    pub fn executor(&self, kind: TaskKind) -> Arc<dyn Executor> {
        Arc::new(ControlledExecutor {
            kind,
            state: Arc::clone(&self.state),
            honours_cancel: true,
        })
    }

    /// Executor for `kind` that ignores cancel requests.
    pub fn stubborn_executor(&self, kind: TaskKind) -> Arc<dyn Executor> {
        Arc::new(ControlledExecutor {
            kind,
            state: Arc::clone(&self.state),
            honours_cancel: false,
        })
    }

    /// Ids of started executions, in start order.
    pub fn started(&self) -> Vec<TaskId> {
        self.state.started.lock().unwrap().clone()
    }

    /// Ids of executions that saw a cancel request.
    pub fn observed_cancel(&self) -> Vec<TaskId> {
        self.state.observed_cancel.lock().unwrap().clone()
    }

    /// Wait until at least `count` executions have started.
    pub async fn wait_started(&self, count: usize) -> Vec<TaskId> {
        loop {
            let changed = self.state.changed.notified();
            let started = self.started();
            if started.len() >= count {
                return started;
            }
            changed.await;
        }
    }

    /// Wait until the execution of `id` has seen a cancel request.
    pub async fn wait_observed_cancel(&self, id: TaskId) {
        loop {
            let changed = self.state.changed.notified();
            if self.observed_cancel().contains(&id) {
                return;
            }
            changed.await;
        }
    }

    /// Send a step to the execution of `id`. Returns `false` if it is not
    /// (or no longer) listening.
    pub fn send(&self, id: TaskId, step: Script) -> bool {
        let scripts = self.state.scripts.lock().unwrap();
        scripts.get(&id).is_some_and(|tx| tx.send(step).is_ok())
    }

    pub fn progress(&self, id: TaskId, progress: f64) -> bool {
        self.send(id, Script::Progress(progress))
    }

    pub fn succeed(&self, id: TaskId, result: Value) -> bool {
        self.send(id, Script::Succeed(result))
    }

    pub fn fail(&self, id: TaskId, error: &str) -> bool {
        self.send(id, Script::Fail(error.to_string()))
    }

    pub fn exit(&self, id: TaskId) -> bool {
        self.send(id, Script::Exit)
    }

    pub fn panic(&self, id: TaskId) -> bool {
        self.send(id, Script::Panic)
    }
}

struct ControlledExecutor {
    kind: TaskKind,
    state: Arc<ControllerState>,
    honours_cancel: bool,
}

impl Executor for ControlledExecutor {
    fn kind(&self) -> TaskKind {
        self.kind
    }

    fn execute(&self, mut ctx: ExecutionContext) -> BoxFuture<()> {
        let state = Arc::clone(&self.state);
        let honours_cancel = self.honours_cancel;

        Box::pin(async move {
            let id = ctx.id();
            let (tx, mut rx) = mpsc::unbounded_channel();
            state.scripts.lock().unwrap().insert(id, tx);
            state.started.lock().unwrap().push(id);
            state.changed.notify_waiters();

            let mut cancel_recorded = false;

            loop {
                match rx.try_recv() {
                    Ok(Script::Progress(p)) => {
                        ctx.progress(p).await;
                    }
                    Ok(Script::Succeed(result)) => {
                        ctx.succeed(result).await;
                        return;
                    }
                    Ok(Script::Fail(error)) => {
                        ctx.fail(error).await;
                        return;
                    }
                    Ok(Script::Exit) => return,
                    Ok(Script::Panic) => panic!("scripted executor panic for {id}"),
                    Err(mpsc::error::TryRecvError::Disconnected) => return,
                    Err(mpsc::error::TryRecvError::Empty) => {}
                }

                let cancelled = if honours_cancel || !cancel_recorded {
                    ctx.pause(POLL).await
                } else {
                    tokio::time::sleep(POLL).await;
                    true
                };

                if cancelled && !cancel_recorded {
                    cancel_recorded = true;
                    state.observed_cancel.lock().unwrap().push(id);
                    state.changed.notify_waiters();
                }
                if cancelled && honours_cancel {
                    ctx.fail(CANCELLED_MESSAGE).await;
                    return;
                }
            }
        })
    }
}
