#![allow(dead_code, unused_imports)]

pub use taskrunner_test_utils::builders::{ConfigFileBuilder, TaskRecordBuilder, at_second};
pub use taskrunner_test_utils::fake_executor::{ExecutorController, Script};
pub use taskrunner_test_utils::{
    init_tracing, start_controlled, start_in_memory, test_options, with_timeout,
};

use std::collections::BTreeSet;

use serde_json::Value;
use taskrunner::engine::{CoreRuntime, TaskEvent};
use taskrunner::exec::ExecutorEvent;
use taskrunner::scheduler::Scheduler;
use taskrunner::task::{TaskId, TaskKind};

/// Core runtime accepting every kind.
pub fn core_with(max_concurrency: usize) -> CoreRuntime {
    let kinds: BTreeSet<TaskKind> = TaskKind::ALL.into_iter().collect();
    CoreRuntime::new(Scheduler::new(max_concurrency, kinds))
}

/// Submit an `example` task into the core at a deterministic timestamp.
pub fn submit(core: &mut CoreRuntime, secs: i64, input: Value) -> TaskId {
    let id = TaskId::new();
    core.step(TaskEvent::Submitted {
        id,
        kind: TaskKind::Example,
        input,
        submitted_at: at_second(secs),
    })
    .expect("submission accepted");
    id
}

pub fn executor_event(core: &mut CoreRuntime, event: ExecutorEvent) {
    core.step(TaskEvent::Executor(event))
        .expect("executor event accepted");
}
