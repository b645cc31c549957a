// src/engine/client.rs

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};

use crate::errors::{Result, TaskRunnerError};
use crate::task::{TaskId, TaskKind, TaskSnapshot};

use super::RuntimeEvent;

/// Cheap, cloneable handle for talking to a running [`Runtime`](super::Runtime).
///
/// Requests go through the event bus; state is observed through published
/// snapshots, which are never torn.
#[derive(Debug, Clone)]
pub struct TaskClient {
    tx: mpsc::Sender<RuntimeEvent>,
    snapshots: watch::Receiver<Arc<TaskSnapshot>>,
}

impl TaskClient {
    pub fn new(tx: mpsc::Sender<RuntimeEvent>, snapshots: watch::Receiver<Arc<TaskSnapshot>>) -> Self {
        Self { tx, snapshots }
    }

    /// Submit a task. Resolves once the task is visible in the snapshot.
    pub async fn submit(&self, kind: TaskKind, input: Value) -> Result<TaskId> {
        let (reply, rx) = oneshot::channel();
        self.send(RuntimeEvent::Submit { kind, input, reply }).await?;
        let id = rx.await.map_err(|_| TaskRunnerError::RuntimeClosed)??;
        Ok(id)
    }

    /// Submit by kind name, e.g. `"password-hash"`.
    pub async fn submit_named(&self, kind: &str, input: Value) -> Result<TaskId> {
        let kind: TaskKind = kind.parse()?;
        self.submit(kind, input).await
    }

    /// Request cancellation. Cancelling a finished task is a no-op.
    pub async fn cancel(&self, id: TaskId) -> Result<()> {
        self.send(RuntimeEvent::Cancel { id }).await
    }

    /// Re-submit the kind and input of `id` as a new task.
    pub async fn retry(&self, id: TaskId) -> Result<TaskId> {
        let (reply, rx) = oneshot::channel();
        self.send(RuntimeEvent::Retry { id, reply }).await?;
        let id = rx.await.map_err(|_| TaskRunnerError::RuntimeClosed)??;
        Ok(id)
    }

    /// Purge the durable history. Tasks in memory are kept.
    pub async fn clear_all(&self) -> Result<()> {
        self.send(RuntimeEvent::ClearAll).await
    }

    /// Wait until all persistence issued so far has been applied.
    pub async fn flush(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(RuntimeEvent::Flush { reply }).await?;
        rx.await.map_err(|_| TaskRunnerError::RuntimeClosed)
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<TaskSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<TaskSnapshot>> {
        self.snapshots.clone()
    }

    /// Wait for the first snapshot satisfying `predicate`, starting with the
    /// current one.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<Arc<TaskSnapshot>>
    where
        F: FnMut(&TaskSnapshot) -> bool,
    {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(|snapshot| predicate(snapshot.as_ref()))
            .await
            .map_err(|_| TaskRunnerError::RuntimeClosed)?;
        Ok(Arc::clone(&snapshot))
    }

    /// Wait until nothing is pending or running.
    pub async fn wait_until_idle(&self) -> Result<Arc<TaskSnapshot>> {
        self.wait_for(TaskSnapshot::is_idle).await
    }

    /// Resolves once the runtime has stopped publishing.
    pub async fn closed(&self) {
        let mut rx = self.snapshots.clone();
        while rx.changed().await.is_ok() {}
    }

    /// Ask the runtime to stop. Stopping an already stopped runtime is fine.
    pub async fn shutdown(&self) -> Result<()> {
        match self.send(RuntimeEvent::ShutdownRequested).await {
            Ok(()) | Err(TaskRunnerError::RuntimeClosed) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn send(&self, event: RuntimeEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| TaskRunnerError::RuntimeClosed)
    }
}
