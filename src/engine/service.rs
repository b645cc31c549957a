// src/engine/service.rs

//! Assembly of a running task service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::errors::{Result, TaskRunnerError};
use crate::exec::{ExecutorGateway, ExecutorRegistry};
use crate::scheduler::Scheduler;
use crate::store::{PersistenceSink, TaskStore};
use crate::types::DEFAULT_MAX_CONCURRENCY;

use super::client::TaskClient;
use super::core::CoreRuntime;
use super::rehydrator::{RehydrationReport, Rehydrator};
use super::runtime::Runtime;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_CANCEL_GRACE: Duration = Duration::from_millis(250);

/// Knobs for [`TaskService::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    pub max_concurrency: usize,
    /// How long a cancelled executor may keep running before it is aborted.
    pub cancel_grace: Duration,
    /// Capacity of the event bus.
    pub channel_capacity: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            cancel_grace: DEFAULT_CANCEL_GRACE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl From<&ConfigFile> for ServiceOptions {
    fn from(cfg: &ConfigFile) -> Self {
        Self {
            max_concurrency: cfg.scheduler.max_concurrency,
            cancel_grace: cfg.executor.cancel_grace(),
            ..Self::default()
        }
    }
}

/// A started runtime plus its persistence writer.
#[derive(Debug)]
pub struct TaskService {
    client: TaskClient,
    runtime: JoinHandle<Result<()>>,
    writer: JoinHandle<()>,
    report: RehydrationReport,
}

impl TaskService {
    /// Rehydrate from `store`, then spawn the runtime.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        options: ServiceOptions,
        executors: ExecutorRegistry,
        store: Arc<dyn TaskStore>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(options.channel_capacity.max(1));

        let gateway = ExecutorGateway::new(executors, event_tx.clone(), options.cancel_grace);
        let scheduler = Scheduler::new(options.max_concurrency, gateway.kinds());
        let mut core = CoreRuntime::new(scheduler);

        let report = Rehydrator::new(Arc::clone(&store)).rehydrate(&mut core);

        let (sink, writer) = PersistenceSink::spawn(store);
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(core.snapshot()));

        let runtime = Runtime::new(core, event_rx, gateway, sink, snapshot_tx);
        let runtime = tokio::spawn(runtime.run());

        info!(
            max_concurrency = options.max_concurrency,
            restored = report.restored,
            "task service started"
        );

        Self {
            client: TaskClient::new(event_tx, snapshot_rx),
            runtime,
            writer,
            report,
        }
    }

    pub fn client(&self) -> TaskClient {
        self.client.clone()
    }

    pub fn rehydration(&self) -> RehydrationReport {
        self.report
    }

    /// Stop the runtime and wait for pending persistence to drain.
    pub async fn shutdown(self) -> Result<()> {
        let TaskService {
            client,
            runtime,
            writer,
            ..
        } = self;

        client.shutdown().await?;
        drop(client);

        let outcome = runtime
            .await
            .map_err(|err| TaskRunnerError::Other(anyhow!("runtime task panicked: {err}")))?;

        writer
            .await
            .map_err(|err| TaskRunnerError::Other(anyhow!("persistence writer panicked: {err}")))?;
        debug!("task service stopped");

        outcome
    }
}
