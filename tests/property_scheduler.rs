mod common;
use crate::common::{at_second, core_with};

use std::collections::HashMap;

use proptest::prelude::*;
use serde_json::json;
use taskrunner::engine::{CoreRuntime, TaskEvent};
use taskrunner::exec::ExecutorEvent;
use taskrunner::task::{TaskId, TaskKind, TaskSnapshot, TaskStatus};

#[derive(Debug, Clone)]
enum Op {
    Submit,
    Progress(usize, f64),
    Succeed(usize),
    Fail(usize),
    Cancel(usize),
    Retry(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Submit),
        3 => (any::<usize>(), -50.0f64..150.0).prop_map(|(i, p)| Op::Progress(i, p)),
        2 => any::<usize>().prop_map(Op::Succeed),
        1 => any::<usize>().prop_map(Op::Fail),
        1 => any::<usize>().prop_map(Op::Cancel),
        1 => any::<usize>().prop_map(Op::Retry),
    ]
}

fn pick(ids: &[TaskId], i: usize) -> Option<TaskId> {
    (!ids.is_empty()).then(|| ids[i % ids.len()])
}

/// Apply one op. Rejected events are fine; they must simply not corrupt state.
fn apply(core: &mut CoreRuntime, ids: &mut Vec<TaskId>, clock: &mut i64, op: Op) {
    *clock += 1;
    let event = match op {
        Op::Submit => {
            let id = TaskId::new();
            ids.push(id);
            TaskEvent::Submitted {
                id,
                kind: TaskKind::Example,
                input: json!(*clock),
                submitted_at: at_second(*clock),
            }
        }
        Op::Progress(i, p) => match pick(ids, i) {
            Some(id) => TaskEvent::Executor(ExecutorEvent::progress(id, p)),
            None => return,
        },
        Op::Succeed(i) => match pick(ids, i) {
            Some(id) => TaskEvent::Executor(ExecutorEvent::success(id, json!("ok"))),
            None => return,
        },
        Op::Fail(i) => match pick(ids, i) {
            Some(id) => TaskEvent::Executor(ExecutorEvent::failure(id, "boom")),
            None => return,
        },
        Op::Cancel(i) => match pick(ids, i) {
            Some(id) => TaskEvent::CancelRequested { id },
            None => return,
        },
        Op::Retry(i) => match pick(ids, i) {
            Some(original) => {
                let id = TaskId::new();
                ids.push(id);
                TaskEvent::RetryRequested {
                    original,
                    id,
                    submitted_at: at_second(*clock),
                }
            }
            None => return,
        },
    };
    let _ = core.step(event);
}

fn check_invariants(snapshot: &TaskSnapshot, max: usize) -> Result<(), TestCaseError> {
    prop_assert!(snapshot.running().len() <= max);

    for task in snapshot.tasks() {
        let pending = snapshot.pending().contains(&task.id);
        let running = snapshot.running().contains(&task.id);
        prop_assert!(!(pending && running));
        match task.status {
            TaskStatus::Queued => prop_assert!(pending),
            TaskStatus::Running => prop_assert!(running),
            _ => prop_assert!(!pending && !running),
        }

        prop_assert_eq!(task.progress == 100, task.status == TaskStatus::Success);
        prop_assert!(task.result.is_none() || task.error.is_none());
        if !task.status.is_terminal() {
            prop_assert!(task.result.is_none() && task.error.is_none());
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn scheduler_invariants_hold_for_any_event_sequence(
        max in 1usize..5,
        ops in proptest::collection::vec(op_strategy(), 1..80),
    ) {
        let mut core = core_with(max);
        let mut ids = Vec::new();
        let mut clock = 0;
        let mut last_progress: HashMap<TaskId, u8> = HashMap::new();

        for op in ops {
            apply(&mut core, &mut ids, &mut clock, op);
            let snapshot = core.snapshot();
            check_invariants(&snapshot, max)?;

            for task in snapshot.tasks() {
                if task.status == TaskStatus::Running {
                    if let Some(prev) = last_progress.get(&task.id) {
                        prop_assert!(task.progress >= *prev, "progress went backwards for {}", task.id);
                    }
                    last_progress.insert(task.id, task.progress);
                }
            }
        }
    }

    #[test]
    fn slots_are_filled_whenever_work_is_pending(
        max in 1usize..5,
        ops in proptest::collection::vec(op_strategy(), 1..80),
    ) {
        let mut core = core_with(max);
        let mut ids = Vec::new();
        let mut clock = 0;

        for op in ops {
            apply(&mut core, &mut ids, &mut clock, op);
            let snapshot = core.snapshot();
            let expected = max.min(snapshot.running().len() + snapshot.pending().len());
            prop_assert_eq!(snapshot.running().len(), expected);
        }
    }
}
