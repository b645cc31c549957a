// src/exec/supervisor.rs

//! Per-execution supervision.
//!
//! Every started execution gets one supervisor task which:
//! - forwards executor events to the runtime until the first terminal one,
//! - discards anything that arrives after a terminal event or a cancel,
//! - turns cancellation into a cooperative `cancel` message followed by a
//!   forced abort once the grace period expires,
//! - reports an executor that dies without a terminal event as a failure.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::errors::TaskError;
use crate::exec::protocol::{ControlMessage, ExecutorEvent};
use crate::task::TaskId;

enum Exit {
    Joined(Result<(), JoinError>),
    Aborted,
    RuntimeGone,
}

pub(crate) struct Supervisor {
    pub id: TaskId,
    pub worker: JoinHandle<()>,
    pub events: mpsc::Receiver<ExecutorEvent>,
    pub control: mpsc::Sender<ControlMessage>,
    pub cancel_rx: oneshot::Receiver<()>,
    pub runtime_tx: mpsc::Sender<RuntimeEvent>,
    pub grace: Duration,
}

struct Forwarder {
    id: TaskId,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    terminal_seen: bool,
    cancel_requested: bool,
}

impl Forwarder {
    /// Forward one event. Returns `false` if the runtime is gone.
    async fn forward(&mut self, event: ExecutorEvent) -> bool {
        if event.id != self.id {
            warn!(task = %self.id, other = %event.id, "executor reported for a foreign id; discarding");
            return true;
        }
        if self.cancel_requested || self.terminal_seen {
            debug!(task = %self.id, ?event, "discarding executor event after terminal/cancel");
            return true;
        }

        let terminal = event.is_terminal();
        if self.runtime_tx.send(RuntimeEvent::Executor(event)).await.is_err() {
            return false;
        }
        if terminal {
            self.terminal_seen = true;
        }
        true
    }
}

impl Supervisor {
    pub(crate) async fn run(self) {
        let Supervisor {
            id,
            mut worker,
            mut events,
            control,
            mut cancel_rx,
            runtime_tx,
            grace,
        } = self;

        let mut fwd = Forwarder {
            id,
            runtime_tx,
            terminal_seen: false,
            cancel_requested: false,
        };
        let mut events_open = true;

        let forced = tokio::time::sleep(grace);
        tokio::pin!(forced);

        let exit = loop {
            tokio::select! {
                maybe = events.recv(), if events_open => match maybe {
                    Some(event) => {
                        if !fwd.forward(event).await {
                            break Exit::RuntimeGone;
                        }
                    }
                    None => events_open = false,
                },
                joined = &mut worker => break Exit::Joined(joined),
                _ = &mut cancel_rx, if !fwd.cancel_requested => {
                    // A dropped handle counts as a cancel request too.
                    fwd.cancel_requested = true;
                    if control.try_send(ControlMessage::cancel(id)).is_err() {
                        debug!(task = %id, "executor no longer reads control messages");
                    }
                    forced.as_mut().reset(Instant::now() + grace);
                },
                _ = &mut forced, if fwd.cancel_requested => {
                    worker.abort();
                    break Exit::Aborted;
                },
            }
        };

        match exit {
            Exit::Joined(joined) => {
                // The worker may finish before its last events were read.
                while let Ok(event) = events.try_recv() {
                    if !fwd.forward(event).await {
                        return;
                    }
                }

                if let Err(err) = &joined {
                    if !err.is_cancelled() {
                        warn!(task = %id, error = %err, "executor panicked");
                    }
                }

                if !fwd.terminal_seen && !fwd.cancel_requested {
                    let crash = TaskError::executor_crashed();
                    warn!(task = %id, error = %crash, "executor exited without a terminal event");
                    let _ = fwd
                        .runtime_tx
                        .send(RuntimeEvent::Executor(ExecutorEvent::failure(
                            id,
                            crash.failure_message(),
                        )))
                        .await;
                }
            }
            Exit::Aborted => {
                info!(task = %id, ?grace, "executor ignored cancel; aborted");
            }
            Exit::RuntimeGone => {
                debug!(task = %id, "runtime closed; aborting executor");
                worker.abort();
            }
        }
    }
}
