// src/store/mod.rs

//! Durable task storage.
//!
//! - [`TaskStore`] is the key-value contract (records keyed by task id).
//! - [`memory`] keeps records in process memory (lost on restart).
//! - [`file`] keeps one JSON file per task on disk.
//! - [`sink`] is the asynchronous, best-effort writer the runtime uses so
//!   that persistence never blocks dispatch.

pub mod file;
pub mod memory;
pub mod sink;

use std::path::Path;
use std::sync::Arc;

use crate::errors::PersistenceError;
use crate::fs::RealFileSystem;
use crate::task::{TaskId, TaskRecord};
use crate::types::StoreMode;

pub use file::FileTaskStore;
pub use memory::MemoryTaskStore;
pub use sink::{PersistOp, PersistenceSink};

/// Result of a bulk read. Undecodable records are reported individually so
/// one bad entry does not hide the others.
#[derive(Debug, Default)]
pub struct LoadedRecords {
    pub records: Vec<TaskRecord>,
    pub failures: Vec<PersistenceError>,
}

/// Abstract storage for task records.
pub trait TaskStore: Send + Sync {
    fn get(&self, id: &TaskId) -> Result<Option<TaskRecord>, PersistenceError>;

    /// Every stored record regardless of status.
    fn get_all(&self) -> Result<LoadedRecords, PersistenceError>;

    /// Insert or overwrite the record for `record.id`.
    fn put(&self, record: &TaskRecord) -> Result<(), PersistenceError>;

    /// Delete every record, keeping the store itself usable.
    fn clear(&self) -> Result<(), PersistenceError>;
}

/// Build the store selected by configuration.
pub fn open_store(mode: StoreMode, path: &Path) -> Result<Arc<dyn TaskStore>, PersistenceError> {
    match mode {
        StoreMode::Memory => Ok(Arc::new(MemoryTaskStore::new())),
        StoreMode::File => {
            let store = FileTaskStore::open(Arc::new(RealFileSystem), path.to_path_buf())?;
            Ok(Arc::new(store))
        }
    }
}
