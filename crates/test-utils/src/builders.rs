#![allow(dead_code)]

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use taskrunner::config::{ConfigFile, RawConfigFile};
use taskrunner::task::{TaskId, TaskKind, TaskRecord, TaskStatus};
use taskrunner::types::StoreMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.config.scheduler.max_concurrency = n;
        self
    }

    pub fn memory_store(mut self) -> Self {
        self.config.store.mode = StoreMode::Memory;
        self
    }

    pub fn file_store(mut self, path: impl AsRef<Path>) -> Self {
        self.config.store.mode = StoreMode::File;
        self.config.store.path = path.as_ref().to_path_buf();
        self
    }

    /// Replace the enabled kinds.
    pub fn enabled(mut self, kinds: &[TaskKind]) -> Self {
        self.config.executor.enabled = kinds.to_vec();
        self
    }

    pub fn step_delay_ms(mut self, ms: u64) -> Self {
        self.config.executor.step_delay_ms = ms;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for persisted `TaskRecord`s.
pub struct TaskRecordBuilder {
    record: TaskRecord,
}

impl TaskRecordBuilder {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            record: TaskRecord {
                id: TaskId::new(),
                kind,
                input: json!("input"),
                status: TaskStatus::Queued,
                result: None,
                error: None,
                submitted_at: at_second(0),
            },
        }
    }

    pub fn id(mut self, id: TaskId) -> Self {
        self.record.id = id;
        self
    }

    pub fn input(mut self, input: Value) -> Self {
        self.record.input = input;
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.record.status = status;
        self
    }

    pub fn succeeded(mut self, result: Value) -> Self {
        self.record.status = TaskStatus::Success;
        self.record.result = Some(result);
        self
    }

    pub fn failed(mut self, error: &str) -> Self {
        self.record.status = TaskStatus::Failure;
        self.record.error = Some(error.to_string());
        self
    }

    /// Seconds after a fixed epoch, so ordering in tests is deterministic.
    pub fn submitted_at_second(mut self, secs: i64) -> Self {
        self.record.submitted_at = at_second(secs);
        self
    }

    pub fn build(self) -> TaskRecord {
        self.record
    }
}

/// Fixed timestamp `secs` seconds after 2024-01-01T00:00:00Z.
pub fn at_second(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid fixed timestamp")
        + chrono::Duration::seconds(secs)
}
