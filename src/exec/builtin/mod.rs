// src/exec/builtin/mod.rs

//! Executors shipped with taskrunner.
//!
//! They simulate work with a configurable delay between progress steps and
//! check for cancellation at every step.

pub mod example;
pub mod greyscale;
pub mod password_hash;
pub mod summarize;

use std::sync::Arc;
use std::time::Duration;

use crate::exec::backend::{Executor, ExecutorRegistry};
use crate::task::TaskKind;

pub use example::ExampleExecutor;
pub use greyscale::GreyscaleExecutor;
pub use password_hash::PasswordHashExecutor;
pub use summarize::SummarizeExecutor;

/// Build the executor for a single kind.
pub fn builtin_executor(kind: TaskKind, step_delay: Duration) -> Arc<dyn Executor> {
    match kind {
        TaskKind::Example => Arc::new(ExampleExecutor::new(step_delay)),
        TaskKind::PasswordHash => Arc::new(PasswordHashExecutor::new(step_delay)),
        TaskKind::TextSummarization => Arc::new(SummarizeExecutor::new(step_delay)),
        TaskKind::ImageToGreyscale => Arc::new(GreyscaleExecutor::new(step_delay)),
    }
}

/// Registry with the built-in executor of every `enabled` kind.
pub fn builtin_registry(enabled: &[TaskKind], step_delay: Duration) -> ExecutorRegistry {
    let mut registry = ExecutorRegistry::new();
    for kind in enabled {
        registry.register(builtin_executor(*kind, step_delay));
    }
    registry
}
