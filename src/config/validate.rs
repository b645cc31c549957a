// src/config/validate.rs

use std::collections::BTreeSet;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskRunnerError};
use crate::types::StoreMode;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskRunnerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.scheduler, raw.store, raw.executor))
    }
}

/// Validate an already-deserialized config without consuming it.
pub fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_scheduler(cfg)?;
    validate_executors(cfg)?;
    validate_store(cfg)?;
    Ok(())
}

fn validate_scheduler(cfg: &RawConfigFile) -> Result<()> {
    if cfg.scheduler.max_concurrency == 0 {
        return Err(TaskRunnerError::ConfigError(
            "[scheduler].max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_executors(cfg: &RawConfigFile) -> Result<()> {
    // Kind names are strongly typed and checked during deserialization.
    if cfg.executor.enabled.is_empty() {
        return Err(TaskRunnerError::ConfigError(
            "[executor].enabled must list at least one task kind".to_string(),
        ));
    }

    let mut seen = BTreeSet::new();
    for kind in &cfg.executor.enabled {
        if !seen.insert(*kind) {
            return Err(TaskRunnerError::ConfigError(format!(
                "[executor].enabled lists '{kind}' more than once"
            )));
        }
    }
    Ok(())
}

fn validate_store(cfg: &RawConfigFile) -> Result<()> {
    if cfg.store.mode == StoreMode::File && cfg.store.path.as_os_str().is_empty() {
        return Err(TaskRunnerError::ConfigError(
            "[store].path must not be empty when mode = \"file\"".to_string(),
        ));
    }
    Ok(())
}
