// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde_json::Value;

use crate::errors::{Result, TaskRunnerError};
use crate::task::TaskKind;

/// Command-line arguments for `taskrunner`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskrunner",
    version,
    about = "Run background tasks with bounded concurrency and durable history.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Taskrunner.toml` in the current working directory, or
    /// built-in defaults if that file does not exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Submit a task at start-up, as `KIND=INPUT`. Repeatable.
    ///
    /// INPUT is parsed as JSON, and taken as a plain string otherwise.
    #[arg(long = "submit", value_name = "KIND=INPUT")]
    pub submit: Vec<String>,

    /// Exit once every submitted task has finished instead of reading
    /// commands from stdin.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKRUNNER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate config, print it, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Parsed `--submit` values, in the order given.
    pub fn submissions(&self) -> Result<Vec<(TaskKind, Value)>> {
        self.submit.iter().map(|s| parse_submission(s)).collect()
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Parse `KIND=INPUT`.
pub fn parse_submission(raw: &str) -> Result<(TaskKind, Value)> {
    let (kind, input) = raw.split_once('=').ok_or_else(|| {
        TaskRunnerError::ConfigError(format!("expected KIND=INPUT, got '{raw}'"))
    })?;
    let kind: TaskKind = kind.parse()?;
    Ok((kind, parse_input(input)))
}

/// JSON if it parses as JSON, a JSON string otherwise.
pub fn parse_input(raw: &str) -> Value {
    let raw = raw.trim();
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
