mod common;
use crate::common::ConfigFileBuilder;

use std::error::Error;
use std::path::PathBuf;

use taskrunner::config::{ConfigFile, RawConfigFile, load_and_validate, load_or_default};
use taskrunner::engine::ServiceOptions;
use taskrunner::errors::TaskRunnerError;
use taskrunner::task::TaskKind;
use taskrunner::types::StoreMode;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(contents: &str) -> Result<(tempfile::TempDir, PathBuf), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Taskrunner.toml");
    std::fs::write(&path, contents)?;
    Ok((dir, path))
}

#[test]
fn empty_file_yields_defaults() -> TestResult {
    let (_dir, path) = write_config("")?;
    let cfg = load_and_validate(&path)?;

    assert_eq!(cfg.scheduler.max_concurrency, 3);
    assert_eq!(cfg.store.mode, StoreMode::File);
    assert_eq!(cfg.store.path, PathBuf::from(".taskrunner/tasks"));
    assert_eq!(cfg.executor.enabled, TaskKind::ALL.to_vec());
    Ok(())
}

#[test]
fn all_sections_are_read() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[scheduler]
max_concurrency = 5

[store]
mode = "memory"

[executor]
enabled = ["example", "text-summarization"]
step_delay_ms = 0
cancel_grace_ms = 1000
"#,
    )?;
    let cfg = load_and_validate(&path)?;

    assert_eq!(cfg.scheduler.max_concurrency, 5);
    assert_eq!(cfg.store.mode, StoreMode::Memory);
    assert_eq!(
        cfg.executor.enabled,
        vec![TaskKind::Example, TaskKind::TextSummarization]
    );
    assert_eq!(cfg.executor.step_delay().as_millis(), 0);

    let options = ServiceOptions::from(&cfg);
    assert_eq!(options.max_concurrency, 5);
    assert_eq!(options.cancel_grace.as_millis(), 1000);
    Ok(())
}

#[test]
fn zero_concurrency_is_rejected() -> TestResult {
    let (_dir, path) = write_config("[scheduler]\nmax_concurrency = 0\n")?;
    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, TaskRunnerError::ConfigError(ref msg) if msg.contains("max_concurrency")));
    Ok(())
}

#[test]
fn unknown_kind_in_config_is_a_toml_error() -> TestResult {
    let (_dir, path) = write_config("[executor]\nenabled = [\"video-encode\"]\n")?;
    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, TaskRunnerError::TomlError(_)), "got {err:?}");
    Ok(())
}

#[test]
fn bad_store_mode_is_a_toml_error() -> TestResult {
    let (_dir, path) = write_config("[store]\nmode = \"cloud\"\n")?;
    assert!(matches!(
        load_and_validate(&path).unwrap_err(),
        TaskRunnerError::TomlError(_)
    ));
    Ok(())
}

#[test]
fn empty_and_duplicate_kind_lists_are_rejected() {
    let err = ConfigFile::try_from(ConfigFileBuilder::new().enabled(&[]).raw()).unwrap_err();
    assert!(matches!(err, TaskRunnerError::ConfigError(ref msg) if msg.contains("at least one")));

    let err = ConfigFile::try_from(
        ConfigFileBuilder::new()
            .enabled(&[TaskKind::Example, TaskKind::Example])
            .raw(),
    )
    .unwrap_err();
    assert!(matches!(err, TaskRunnerError::ConfigError(ref msg) if msg.contains("more than once")));
}

#[test]
fn file_store_needs_a_path() {
    let mut raw = RawConfigFile::default();
    raw.store.path = PathBuf::new();
    assert!(ConfigFile::try_from(raw.clone()).is_err());

    raw.store.mode = StoreMode::Memory;
    assert!(ConfigFile::try_from(raw).is_ok());
}

#[test]
fn explicit_missing_path_is_an_io_error() {
    let err = load_or_default(Some(PathBuf::from("/definitely/not/here.toml").as_path())).unwrap_err();
    assert!(matches!(err, TaskRunnerError::IoError(_)));
}

#[test]
fn builder_produces_valid_config() {
    let cfg = ConfigFileBuilder::new()
        .max_concurrency(2)
        .memory_store()
        .enabled(&[TaskKind::PasswordHash])
        .step_delay_ms(1)
        .build();
    assert_eq!(cfg.scheduler.max_concurrency, 2);
    assert_eq!(cfg.executor.enabled, vec![TaskKind::PasswordHash]);
}
