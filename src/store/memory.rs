// src/store/memory.rs

use std::collections::BTreeMap;
use std::sync::Mutex;

use tracing::debug;

use crate::errors::PersistenceError;
use crate::store::{LoadedRecords, TaskStore};
use crate::task::{TaskId, TaskRecord};

/// Stores records in memory only.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    records: Mutex<BTreeMap<TaskId, TaskRecord>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = TaskRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.id, r)).collect();
        Self {
            records: Mutex::new(map),
        }
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<usize, PersistenceError> {
        let records = self.records.lock().map_err(|_| PersistenceError::Poisoned)?;
        Ok(records.len())
    }
}

impl TaskStore for MemoryTaskStore {
    fn get(&self, id: &TaskId) -> Result<Option<TaskRecord>, PersistenceError> {
        let records = self.records.lock().map_err(|_| PersistenceError::Poisoned)?;
        Ok(records.get(id).cloned())
    }

    fn get_all(&self) -> Result<LoadedRecords, PersistenceError> {
        let records = self.records.lock().map_err(|_| PersistenceError::Poisoned)?;
        Ok(LoadedRecords {
            records: records.values().cloned().collect(),
            failures: Vec::new(),
        })
    }

    fn put(&self, record: &TaskRecord) -> Result<(), PersistenceError> {
        let mut records = self.records.lock().map_err(|_| PersistenceError::Poisoned)?;
        records.insert(record.id, record.clone());
        debug!(task = %record.id, status = %record.status, "stored task record (memory)");
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        let mut records = self.records.lock().map_err(|_| PersistenceError::Poisoned)?;
        let removed = records.len();
        records.clear();
        debug!(removed, "cleared task records (memory)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn poisoned_lock_is_reported_not_hidden() {
        let store = Arc::new(MemoryTaskStore::new());
        assert_eq!(store.count().unwrap(), 0);

        let poisoner = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.records.lock().unwrap();
            panic!("poison the record lock");
        })
        .join();

        assert!(matches!(store.count(), Err(PersistenceError::Poisoned)));
        assert!(matches!(store.get_all(), Err(PersistenceError::Poisoned)));
    }
}
