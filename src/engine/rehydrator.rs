// src/engine/rehydrator.rs

//! Start-up restoration of persisted tasks.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::TaskError;
use crate::store::TaskStore;
use crate::task::TaskRecord;

use super::TaskEvent;
use super::core::CoreRuntime;

/// What happened to the stored records during rehydration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RehydrationReport {
    /// Records inserted into the registry.
    pub restored: usize,
    /// Non-terminal records whose payload cannot be resumed.
    pub dropped: usize,
    /// Records (or whole reads) that could not be decoded.
    pub failed: usize,
}

/// Reads every stored record once and restores it into the core.
///
/// Restored tasks are visible only: nothing is re-dispatched and no executor
/// is contacted. The rehydrator is consumed by [`rehydrate`](Self::rehydrate)
/// so it cannot run twice.
pub struct Rehydrator {
    store: Arc<dyn TaskStore>,
}

impl Rehydrator {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Must run before the runtime accepts any submission.
    pub fn rehydrate(self, core: &mut CoreRuntime) -> RehydrationReport {
        let mut report = RehydrationReport::default();

        let loaded = match self.store.get_all() {
            Ok(loaded) => loaded,
            Err(err) => {
                let err = TaskError::from(err);
                warn!(error = %err, "could not read task store; starting empty");
                report.failed += 1;
                return report;
            }
        };

        for failure in loaded.failures {
            let err = TaskError::from(failure);
            warn!(error = %err, "skipping unreadable task record");
            report.failed += 1;
        }

        let mut records = loaded.records;
        records.sort_by_key(|record| record.submitted_at);

        for record in records {
            if !should_restore(&record) {
                debug!(task = %record.id, kind = %record.kind, status = %record.status, "dropping non-resumable unfinished task");
                report.dropped += 1;
                continue;
            }

            match core.step(TaskEvent::Rehydrated(record)) {
                Ok(_) => report.restored += 1,
                Err(err) => {
                    warn!(error = %err, "rehydrated record rejected");
                    report.failed += 1;
                }
            }
        }

        info!(
            restored = report.restored,
            dropped = report.dropped,
            failed = report.failed,
            "rehydration complete"
        );
        report
    }
}

/// Finished tasks are always restored; unfinished ones only when their
/// payload survived serialization intact.
fn should_restore(record: &TaskRecord) -> bool {
    record.status.is_terminal() || record.kind.payload_resumable()
}
