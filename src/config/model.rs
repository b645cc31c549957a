// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::store::file::DEFAULT_STORE_DIR;
use crate::task::TaskKind;
use crate::types::{DEFAULT_MAX_CONCURRENCY, StoreMode};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [scheduler]
/// max_concurrency = 3
///
/// [store]
/// mode = "file"
/// path = ".taskrunner/tasks"
///
/// [executor]
/// enabled = ["example", "password-hash"]
/// step_delay_ms = 100
/// cancel_grace_ms = 250
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub executor: ExecutorSection,
}

/// Validated configuration. Obtain one through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerSection,
    pub store: StoreSection,
    pub executor: ExecutorSection,
}

impl ConfigFile {
    /// Build without validation. Only `validate.rs` should call this.
    pub(crate) fn new_unchecked(
        scheduler: SchedulerSection,
        store: StoreSection,
        executor: ExecutorSection,
    ) -> Self {
        Self {
            scheduler,
            store,
            executor,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.scheduler, raw.store, raw.executor)
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Maximum number of tasks running at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// `[store]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    /// `"file"` (default) or `"memory"`.
    #[serde(default)]
    pub mode: StoreMode,

    /// Directory holding one JSON file per task. Ignored in memory mode.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_DIR)
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            mode: StoreMode::default(),
            path: default_store_path(),
        }
    }
}

/// `[executor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorSection {
    /// Kinds that get a built-in executor. Submissions of other kinds are
    /// rejected.
    #[serde(default = "default_enabled")]
    pub enabled: Vec<TaskKind>,

    /// Simulated work time between two progress reports.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,

    /// How long a cancelled executor may keep running before it is aborted.
    #[serde(default = "default_cancel_grace_ms")]
    pub cancel_grace_ms: u64,
}

fn default_enabled() -> Vec<TaskKind> {
    TaskKind::ALL.to_vec()
}

fn default_step_delay_ms() -> u64 {
    100
}

fn default_cancel_grace_ms() -> u64 {
    250
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            step_delay_ms: default_step_delay_ms(),
            cancel_grace_ms: default_cancel_grace_ms(),
        }
    }
}

impl ExecutorSection {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }
}
