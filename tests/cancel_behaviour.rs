mod common;
use crate::common::{ExecutorController, init_tracing, start_controlled, start_in_memory, test_options, with_timeout};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use taskrunner::engine::TaskService;
use taskrunner::errors::EXECUTOR_CRASHED;
use taskrunner::exec::ExecutorRegistry;
use taskrunner::store::{MemoryTaskStore, TaskStore};
use taskrunner::task::{TaskKind, TaskStatus};

type TestResult = Result<(), Box<dyn Error>>;

fn stubborn_service(controller: &ExecutorController, max: usize) -> TaskService {
    let executors = ExecutorRegistry::new().with(controller.stubborn_executor(TaskKind::Example));
    TaskService::start(test_options(max), executors, Arc::new(MemoryTaskStore::new()))
}

#[tokio::test]
async fn cancel_while_queued_never_contacts_an_executor() -> TestResult {
    init_tracing();
    let controller = ExecutorController::new();
    let service = start_in_memory(&controller, 1);
    let client = service.client();

    with_timeout(async {
        let busy = client.submit(TaskKind::Example, json!("busy")).await?;
        let queued = client.submit(TaskKind::Example, json!("queued")).await?;
        client.cancel(queued).await?;
        client.flush().await?;

        let snapshot = client.snapshot();
        assert_eq!(snapshot.get(&queued).unwrap().status, TaskStatus::Cancelled);
        assert!(snapshot.pending().is_empty());

        controller.wait_started(1).await;
        controller.succeed(busy, json!("done"));
        client.wait_until_idle().await?;

        assert_eq!(controller.started(), vec![busy]);
        Ok::<(), Box<dyn Error>>(())
    })
    .await?;

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn cancel_while_running_commits_immediately() -> TestResult {
    init_tracing();
    let controller = ExecutorController::new();
    let service = start_in_memory(&controller, 3);
    let client = service.client();

    with_timeout(async {
        let id = client.submit(TaskKind::Example, json!("x")).await?;
        controller.wait_started(1).await;

        client.cancel(id).await?;
        // Any later request is applied after the cancel.
        client.flush().await?;
        let task = client.snapshot().get(&id).cloned().unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
        assert_eq!(task.error, None);
        assert!(client.snapshot().running().is_empty());

        // The cooperative executor answers with a cancellation failure,
        // which must not overwrite the cancelled status.
        controller.wait_observed_cancel(id).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        let task = client.snapshot().get(&id).cloned().unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
        assert_eq!(task.error, None);
        Ok::<(), Box<dyn Error>>(())
    })
    .await?;

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn late_success_after_cancel_is_discarded() -> TestResult {
    init_tracing();
    let controller = ExecutorController::new();
    let service = stubborn_service(&controller, 3);
    let client = service.client();

    with_timeout(async {
        let id = client.submit(TaskKind::Example, json!("x")).await?;
        controller.wait_started(1).await;

        client.cancel(id).await?;
        controller.wait_observed_cancel(id).await;
        controller.succeed(id, json!("too late"));
        tokio::time::sleep(Duration::from_millis(30)).await;

        let task = client.snapshot().get(&id).cloned().unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
        assert_eq!(task.result, None);
        Ok::<(), Box<dyn Error>>(())
    })
    .await?;

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn stubborn_executor_is_aborted_after_the_grace_period() -> TestResult {
    init_tracing();
    let controller = ExecutorController::new();
    let service = stubborn_service(&controller, 1);
    let client = service.client();

    with_timeout(async {
        let stuck = client.submit(TaskKind::Example, json!("stuck")).await?;
        let next = client.submit(TaskKind::Example, json!("next")).await?;
        controller.wait_started(1).await;

        client.cancel(stuck).await?;
        // The slot is freed by the cancel itself, not by the abort.
        let started = controller.wait_started(2).await;
        assert_eq!(started[1], next);

        // test_options uses a 50 ms grace period.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!controller.progress(stuck, 50.0), "executor should be gone");
        Ok::<(), Box<dyn Error>>(())
    })
    .await?;

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn cancelling_a_finished_task_is_a_no_op() -> TestResult {
    init_tracing();
    let controller = ExecutorController::new();
    let store = Arc::new(MemoryTaskStore::new());
    let service = start_controlled(&controller, 3, store.clone());
    let client = service.client();

    with_timeout(async {
        let id = client.submit(TaskKind::Example, json!("x")).await?;
        controller.wait_started(1).await;
        controller.succeed(id, json!("done"));
        let before = client
            .wait_for(|s| s.get(&id).is_some_and(|t| t.status == TaskStatus::Success))
            .await?;
        client.flush().await?;
        let stored = store.get(&id)?;

        client.cancel(id).await?;
        client.cancel(id).await?;
        client.flush().await?;

        assert_eq!(client.snapshot().get(&id), before.get(&id));
        assert_eq!(store.get(&id)?, stored);
        Ok::<(), Box<dyn Error>>(())
    })
    .await?;

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn executor_exiting_without_outcome_is_a_failure() -> TestResult {
    init_tracing();
    let controller = ExecutorController::new();
    let service = start_in_memory(&controller, 3);
    let client = service.client();

    with_timeout(async {
        let exited = client.submit(TaskKind::Example, json!("exit")).await?;
        let panicked = client.submit(TaskKind::Example, json!("panic")).await?;
        let healthy = client.submit(TaskKind::Example, json!("ok")).await?;
        controller.wait_started(3).await;

        controller.progress(exited, 30.0);
        controller.exit(exited);
        controller.panic(panicked);
        controller.succeed(healthy, json!("fine"));

        let snapshot = client.wait_until_idle().await?;
        for id in [exited, panicked] {
            let task = snapshot.get(&id).unwrap();
            assert_eq!(task.status, TaskStatus::Failure);
            assert_eq!(task.error.as_deref(), Some(EXECUTOR_CRASHED));
        }
        assert_eq!(snapshot.get(&healthy).unwrap().status, TaskStatus::Success);
        Ok::<(), Box<dyn Error>>(())
    })
    .await?;

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn shutdown_cancels_live_executions() -> TestResult {
    init_tracing();
    let controller = ExecutorController::new();
    let service = start_in_memory(&controller, 3);
    let client = service.client();

    let id = with_timeout(async {
        let id = client.submit(TaskKind::Example, json!("x")).await?;
        controller.wait_started(1).await;
        Ok::<_, Box<dyn Error>>(id)
    })
    .await?;

    with_timeout(service.shutdown()).await?;
    with_timeout(controller.wait_observed_cancel(id)).await;
    assert!(client.submit(TaskKind::Example, json!("y")).await.is_err());
    Ok(())
}
