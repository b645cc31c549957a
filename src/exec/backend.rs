// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! The gateway looks executors up by [`TaskKind`] in an [`ExecutorRegistry`].
//! Production code registers the built-in executors from
//! [`crate::exec::builtin`]; tests can register their own implementations
//! that script progress and outcomes without doing any real work.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::TaskError;
use crate::exec::protocol::{Command, ControlMessage, ExecutorEvent, StartMessage};
use crate::task::{TaskId, TaskKind};

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Error reported by executors that stop because of a cancel request.
pub const CANCELLED_MESSAGE: &str = "Task was cancelled";

/// Capability implemented by every executor variant.
pub trait Executor: Send + Sync {
    /// The task kind this executor handles.
    fn kind(&self) -> TaskKind;

    /// Run one execution to completion.
    ///
    /// The implementation should emit zero or more progress events followed
    /// by exactly one terminal event through `ctx`. Returning without a
    /// terminal event (or panicking) is reported as a crash.
    fn execute(&self, ctx: ExecutionContext) -> BoxFuture<()>;
}

/// One end of the bidirectional channel between the gateway and a running
/// executor.
pub struct ExecutionContext {
    start: StartMessage,
    events: mpsc::Sender<ExecutorEvent>,
    control: mpsc::Receiver<ControlMessage>,
    cancelled: bool,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("id", &self.start.id)
            .field("kind", &self.start.kind)
            .field("cancelled", &self.cancelled)
            .finish_non_exhaustive()
    }
}

impl ExecutionContext {
    /// Build a context plus the gateway-side channel ends: the event receiver
    /// and the control sender.
    pub fn channel(
        start: StartMessage,
    ) -> (
        Self,
        mpsc::Receiver<ExecutorEvent>,
        mpsc::Sender<ControlMessage>,
    ) {
        let (event_tx, event_rx) = mpsc::channel(32);
        let (control_tx, control_rx) = mpsc::channel(4);
        let ctx = Self {
            start,
            events: event_tx,
            control: control_rx,
            cancelled: false,
        };
        (ctx, event_rx, control_tx)
    }

    pub fn id(&self) -> TaskId {
        self.start.id
    }

    pub fn kind(&self) -> TaskKind {
        self.start.kind
    }

    pub fn input(&self) -> &Value {
        &self.start.input
    }

    /// Report progress. Returns `false` once nobody is listening anymore.
    pub async fn progress(&self, progress: f64) -> bool {
        self.events
            .send(ExecutorEvent::progress(self.start.id, progress))
            .await
            .is_ok()
    }

    pub async fn succeed(self, result: Value) {
        let _ = self
            .events
            .send(ExecutorEvent::success(self.start.id, result))
            .await;
    }

    pub async fn fail(self, error: impl Into<String>) {
        let _ = self
            .events
            .send(ExecutorEvent::failure(self.start.id, error))
            .await;
    }

    /// Non-blocking check for a pending cancel request.
    pub fn is_cancelled(&mut self) -> bool {
        while let Ok(msg) = self.control.try_recv() {
            self.observe(msg);
        }
        self.cancelled
    }

    /// Sleep for `delay`, waking early if a cancel request arrives.
    ///
    /// Returns `true` if the execution was cancelled.
    pub async fn pause(&mut self, delay: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            msg = self.control.recv() => match msg {
                Some(msg) => self.observe(msg),
                // Gateway dropped the control sender: treat as cancellation.
                None => self.cancelled = true,
            },
        }

        self.cancelled
    }

    fn observe(&mut self, msg: ControlMessage) {
        match msg.command {
            Command::Cancel if msg.id == self.start.id => {
                debug!(task = %msg.id, "executor observed cancel request");
                self.cancelled = true;
            }
            Command::Cancel => {
                debug!(task = %msg.id, own = %self.start.id, "ignoring cancel for another task");
            }
        }
    }
}

/// Table of executors keyed by task kind.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<TaskKind, Arc<dyn Executor>>,
}

impl fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor, replacing any previous one for the same kind.
    pub fn register(&mut self, executor: Arc<dyn Executor>) {
        self.executors.insert(executor.kind(), executor);
    }

    pub fn with(mut self, executor: Arc<dyn Executor>) -> Self {
        self.register(executor);
        self
    }

    pub fn get(&self, kind: TaskKind) -> Result<Arc<dyn Executor>, TaskError> {
        self.executors
            .get(&kind)
            .cloned()
            .ok_or_else(|| TaskError::UnknownKind(kind.to_string()))
    }

    pub fn contains(&self, kind: TaskKind) -> bool {
        self.executors.contains_key(&kind)
    }

    pub fn kinds(&self) -> BTreeSet<TaskKind> {
        self.executors.keys().copied().collect()
    }
}
