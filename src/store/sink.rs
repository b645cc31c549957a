// src/store/sink.rs

//! Fire-and-forget persistence.
//!
//! The runtime hands every record to the sink and moves on; a background task
//! applies the operations to the [`TaskStore`] in the order they were issued.
//! Failures are logged and never reach the scheduler.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::TaskError;
use crate::store::TaskStore;
use crate::task::TaskRecord;

#[derive(Debug)]
pub enum PersistOp {
    Put(TaskRecord),
    Clear,
    /// Acknowledge once every earlier operation has been applied.
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct PersistenceSink {
    tx: mpsc::UnboundedSender<PersistOp>,
}

impl fmt::Debug for PersistenceSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceSink")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl PersistenceSink {
    /// Spawn the background writer.
    ///
    /// The writer finishes once every sink clone has been dropped and the
    /// remaining operations have been applied.
    pub fn spawn(store: Arc<dyn TaskStore>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<PersistOp>();

        let handle = tokio::spawn(async move {
            debug!("persistence writer started");
            while let Some(op) = rx.recv().await {
                apply(store.as_ref(), op);
            }
            info!("persistence writer finished (channel closed)");
        });

        (Self { tx }, handle)
    }

    pub fn put(&self, record: TaskRecord) {
        self.send(PersistOp::Put(record));
    }

    pub fn clear(&self) {
        self.send(PersistOp::Clear);
    }

    /// Wait until everything issued so far has reached the store.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        self.flush_with(tx);
        let _ = rx.await;
    }

    /// Like [`flush`](Self::flush), but acknowledges through `ack` instead
    /// of waiting.
    pub fn flush_with(&self, ack: oneshot::Sender<()>) {
        self.send(PersistOp::Flush(ack));
    }

    fn send(&self, op: PersistOp) {
        if let Err(err) = self.tx.send(op) {
            warn!(op = ?err.0, "persistence writer is gone; dropping operation");
        }
    }
}

fn apply(store: &dyn TaskStore, op: PersistOp) {
    match op {
        PersistOp::Put(record) => {
            if let Err(err) = store.put(&record) {
                let err = TaskError::from(err);
                warn!(task = %record.id, status = %record.status, error = %err, "persisting task record failed");
            }
        }
        PersistOp::Clear => match store.clear() {
            Ok(()) => info!("durable task history cleared"),
            Err(err) => {
                let err = TaskError::from(err);
                warn!(error = %err, "clearing durable task history failed");
            }
        },
        PersistOp::Flush(ack) => {
            let _ = ack.send(());
        }
    }
}
