// src/store/file.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::PersistenceError;
use crate::fs::FileSystem;
use crate::store::{LoadedRecords, TaskStore};
use crate::task::{TaskId, TaskRecord};

/// Default store directory, relative to the working directory.
pub const DEFAULT_STORE_DIR: &str = ".taskrunner/tasks";

const RECORD_EXTENSION: &str = "json";

/// Stores one JSON document per task under a directory:
///
/// `<dir>/<task-id>.json`
pub struct FileTaskStore {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

impl std::fmt::Debug for FileTaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTaskStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl FileTaskStore {
    /// Open (and create if missing) the store directory.
    pub fn open(fs: Arc<dyn FileSystem>, dir: PathBuf) -> Result<Self, PersistenceError> {
        fs.create_dir_all(&dir).map_err(|cause| PersistenceError::Io {
            path: dir.clone(),
            cause,
        })?;
        info!(dir = ?dir, "opened file task store");
        Ok(Self { fs, dir })
    }

    fn record_path(&self, id: &TaskId) -> PathBuf {
        self.dir.join(format!("{id}.{RECORD_EXTENSION}"))
    }

    fn record_files(&self) -> Result<Vec<PathBuf>, PersistenceError> {
        if !self.fs.exists(&self.dir) {
            return Ok(Vec::new());
        }
        let entries = self.fs.read_dir(&self.dir).map_err(|cause| PersistenceError::Io {
            path: self.dir.clone(),
            cause,
        })?;
        Ok(entries
            .into_iter()
            .filter(|p| p.extension().is_some_and(|ext| ext == RECORD_EXTENSION))
            .collect())
    }

    fn read_record(&self, path: &Path) -> Result<TaskRecord, PersistenceError> {
        let contents = self.fs.read_to_string(path).map_err(|cause| PersistenceError::Io {
            path: path.to_path_buf(),
            cause,
        })?;
        serde_json::from_str(&contents).map_err(|source| PersistenceError::Codec {
            key: path.display().to_string(),
            source,
        })
    }
}

impl TaskStore for FileTaskStore {
    fn get(&self, id: &TaskId) -> Result<Option<TaskRecord>, PersistenceError> {
        let path = self.record_path(id);
        if !self.fs.exists(&path) {
            return Ok(None);
        }
        self.read_record(&path).map(Some)
    }

    fn get_all(&self) -> Result<LoadedRecords, PersistenceError> {
        let mut loaded = LoadedRecords::default();
        for path in self.record_files()? {
            match self.read_record(&path) {
                Ok(record) => loaded.records.push(record),
                Err(err) => loaded.failures.push(err),
            }
        }
        debug!(
            dir = ?self.dir,
            records = loaded.records.len(),
            failures = loaded.failures.len(),
            "loaded task records (file)"
        );
        Ok(loaded)
    }

    fn put(&self, record: &TaskRecord) -> Result<(), PersistenceError> {
        let path = self.record_path(&record.id);
        let json = serde_json::to_vec_pretty(record).map_err(|source| PersistenceError::Codec {
            key: record.id.to_string(),
            source,
        })?;
        self.fs
            .write_atomic(&path, &json)
            .map_err(|cause| PersistenceError::Io { path, cause })?;
        debug!(task = %record.id, status = %record.status, "stored task record (file)");
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        let files = self.record_files()?;
        let removed = files.len();
        for path in files {
            self.fs
                .remove_file(&path)
                .map_err(|cause| PersistenceError::Io { path, cause })?;
        }
        info!(dir = ?self.dir, removed, "cleared task records (file)");
        Ok(())
    }
}
