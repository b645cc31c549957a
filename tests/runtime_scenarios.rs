mod common;
use crate::common::{ExecutorController, init_tracing, start_controlled, start_in_memory, with_timeout};

use std::collections::HashSet;
use std::error::Error;
use std::sync::Arc;

use serde_json::json;
use taskrunner::engine::TaskService;
use taskrunner::errors::{TaskError, TaskRunnerError};
use taskrunner::exec::ExecutorRegistry;
use taskrunner::store::{FileTaskStore, MemoryTaskStore, TaskStore};
use taskrunner::fs::RealFileSystem;
use taskrunner::task::{TaskKind, TaskStatus};
use taskrunner_test_utils::test_options;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn fourth_task_starts_only_after_a_slot_frees() -> TestResult {
    init_tracing();
    let controller = ExecutorController::new();
    let service = start_in_memory(&controller, 3);
    let client = service.client();

    with_timeout(async {
        let mut ids = Vec::new();
        for i in 0..4 {
            ids.push(client.submit(TaskKind::Example, json!(i)).await?);
        }

        let snapshot = client.snapshot();
        assert_eq!(snapshot.running(), &ids[..3]);
        assert_eq!(snapshot.pending(), &ids[3..]);
        assert_eq!(snapshot.get(&ids[3]).unwrap().status, TaskStatus::Queued);

        let started: HashSet<_> = controller.wait_started(3).await.into_iter().collect();
        assert_eq!(started, ids[..3].iter().copied().collect());

        assert!(controller.succeed(ids[0], json!("done")));
        client
            .wait_for(|s| s.get(&ids[3]).is_some_and(|t| t.status == TaskStatus::Running))
            .await?;

        let started = controller.wait_started(4).await;
        assert_eq!(started.len(), 4);
        assert!(started.contains(&ids[3]));
        assert_eq!(client.snapshot().get(&ids[0]).unwrap().status, TaskStatus::Success);
        Ok::<(), Box<dyn Error>>(())
    })
    .await?;

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn submitted_task_is_visible_when_submit_returns() -> TestResult {
    init_tracing();
    let controller = ExecutorController::new();
    let service = start_in_memory(&controller, 1);
    let client = service.client();

    let first = client.submit(TaskKind::Example, json!("a")).await?;
    let second = client.submit(TaskKind::Example, json!("b")).await?;

    let snapshot = client.snapshot();
    assert_eq!(snapshot.get(&first).unwrap().status, TaskStatus::Running);
    assert_eq!(snapshot.get(&second).unwrap().status, TaskStatus::Queued);
    assert_eq!(snapshot.get(&second).unwrap().input, json!("b"));

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn progress_and_success_flow_into_the_snapshot() -> TestResult {
    init_tracing();
    let controller = ExecutorController::new();
    let service = start_in_memory(&controller, 3);
    let client = service.client();

    with_timeout(async {
        let id = client.submit(TaskKind::Example, json!("x")).await?;
        controller.wait_started(1).await;

        controller.progress(id, 42.5);
        let snapshot = client
            .wait_for(|s| s.get(&id).is_some_and(|t| t.progress == 42))
            .await?;
        assert_eq!(snapshot.get(&id).unwrap().status, TaskStatus::Running);

        controller.progress(id, 10.0);
        controller.succeed(id, json!({ "ok": true }));
        let snapshot = client
            .wait_for(|s| s.get(&id).is_some_and(|t| t.status == TaskStatus::Success))
            .await?;
        let task = snapshot.get(&id).unwrap();
        assert_eq!(task.progress, 100);
        assert_eq!(task.result, Some(json!({ "ok": true })));
        assert_eq!(task.error, None);
        Ok::<(), Box<dyn Error>>(())
    })
    .await?;

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn retry_after_failure_creates_a_new_queued_task() -> TestResult {
    init_tracing();
    let controller = ExecutorController::new();
    // A ceiling of 1 with a blocker keeps the retried task observably queued.
    let service = start_in_memory(&controller, 1);
    let client = service.client();

    with_timeout(async {
        let failing = client.submit(TaskKind::TextSummarization, json!("some text")).await?;
        controller.wait_started(1).await;
        controller.fail(failing, "boom");
        client
            .wait_for(|s| s.get(&failing).is_some_and(|t| t.status == TaskStatus::Failure))
            .await?;

        let blocker = client.submit(TaskKind::Example, json!("blocker")).await?;
        let retried = client.retry(failing).await?;
        assert_ne!(retried, failing);

        let snapshot = client.snapshot();
        let original = snapshot.get(&failing).unwrap();
        let copy = snapshot.get(&retried).unwrap();
        assert_eq!(original.status, TaskStatus::Failure);
        assert_eq!(original.error.as_deref(), Some("boom"));
        assert_eq!(copy.status, TaskStatus::Queued);
        assert_eq!(copy.kind, TaskKind::TextSummarization);
        assert_eq!(copy.input, json!("some text"));
        assert_eq!(snapshot.get(&blocker).unwrap().status, TaskStatus::Running);
        Ok::<(), Box<dyn Error>>(())
    })
    .await?;

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn retry_of_unknown_task_is_an_error() -> TestResult {
    init_tracing();
    let controller = ExecutorController::new();
    let service = start_in_memory(&controller, 3);
    let client = service.client();

    let ghost = taskrunner::task::TaskId::new();
    let err = client.retry(ghost).await.unwrap_err();
    assert!(matches!(err, TaskRunnerError::Task(TaskError::UnknownTask(id)) if id == ghost));

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn unknown_kind_is_rejected_and_never_queued() -> TestResult {
    init_tracing();
    let controller = ExecutorController::new();
    let executors = ExecutorRegistry::new().with(controller.executor(TaskKind::Example));
    let service = TaskService::start(test_options(3), executors, Arc::new(MemoryTaskStore::new()));
    let client = service.client();

    let err = client
        .submit(TaskKind::PasswordHash, json!("hunter2"))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskRunnerError::Task(TaskError::UnknownKind(ref k)) if k == "password-hash"));
    assert!(client.snapshot().is_empty());

    let err = client.submit_named("video-encode", json!(null)).await.unwrap_err();
    assert!(matches!(err, TaskRunnerError::Task(TaskError::UnknownKind(_))));

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn every_transition_reaches_the_store() -> TestResult {
    init_tracing();
    let controller = ExecutorController::new();
    let store = Arc::new(MemoryTaskStore::new());
    let service = start_controlled(&controller, 3, store.clone());
    let client = service.client();

    with_timeout(async {
        let id = client.submit(TaskKind::Example, json!("x")).await?;
        client.flush().await?;
        assert_eq!(store.get(&id)?.unwrap().status, TaskStatus::Running);

        controller.wait_started(1).await;
        controller.succeed(id, json!("done"));
        client
            .wait_for(|s| s.get(&id).is_some_and(|t| t.status == TaskStatus::Success))
            .await?;
        client.flush().await?;

        let record = store.get(&id)?.unwrap();
        assert_eq!(record.status, TaskStatus::Success);
        assert_eq!(record.result, Some(json!("done")));
        Ok::<(), Box<dyn Error>>(())
    })
    .await?;

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn clear_all_purges_history_but_keeps_memory() -> TestResult {
    init_tracing();
    let controller = ExecutorController::new();
    let store = Arc::new(MemoryTaskStore::new());
    let service = start_controlled(&controller, 3, store.clone());
    let client = service.client();

    with_timeout(async {
        let id = client.submit(TaskKind::Example, json!("x")).await?;
        controller.wait_started(1).await;
        controller.succeed(id, json!("done"));
        client
            .wait_for(|s| s.get(&id).is_some_and(|t| t.status == TaskStatus::Success))
            .await?;

        client.clear_all().await?;
        client.flush().await?;

        assert_eq!(store.count()?, 0);
        assert_eq!(client.snapshot().get(&id).unwrap().status, TaskStatus::Success);
        Ok::<(), Box<dyn Error>>(())
    })
    .await?;

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn finished_tasks_survive_a_restart() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let controller = ExecutorController::new();

    let open = || -> Result<Arc<dyn TaskStore>, Box<dyn Error>> {
        Ok(Arc::new(FileTaskStore::open(
            Arc::new(RealFileSystem),
            dir.path().join("tasks"),
        )?))
    };

    let (ok_id, failed_id, before) = with_timeout(async {
        let service = start_controlled(&controller, 3, open()?);
        let client = service.client();

        let ok_id = client.submit(TaskKind::Example, json!({ "n": 1 })).await?;
        let failed_id = client.submit(TaskKind::Example, json!({ "n": 2 })).await?;
        controller.wait_started(2).await;
        controller.succeed(ok_id, json!({ "answer": [1, 2, 3] }));
        controller.fail(failed_id, "boom");
        let before = client
            .wait_for(|s| s.get(&ok_id).is_some_and(|t| t.status.is_terminal())
                && s.get(&failed_id).is_some_and(|t| t.status.is_terminal()))
            .await?;

        service.shutdown().await?;
        Ok::<_, Box<dyn Error>>((ok_id, failed_id, before))
    })
    .await?;

    let service = start_controlled(&controller, 3, open()?);
    assert_eq!(service.rehydration().restored, 2);
    let after = service.client().snapshot();

    for id in [ok_id, failed_id] {
        let old = before.get(&id).unwrap().to_record();
        let new = after.get(&id).unwrap().to_record();
        assert_eq!(old, new);
    }
    assert_eq!(after.get(&ok_id).unwrap().progress, 100);
    assert!(after.is_idle());

    service.shutdown().await?;
    Ok(())
}
