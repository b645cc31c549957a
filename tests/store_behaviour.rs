mod common;
use crate::common::{ExecutorController, TaskRecordBuilder, init_tracing, start_controlled, with_timeout};

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use taskrunner::fs::RealFileSystem;
use taskrunner::fs::mock::MockFileSystem;
use taskrunner::store::{FileTaskStore, MemoryTaskStore, PersistenceSink, TaskStore};
use taskrunner::task::{TaskKind, TaskStatus};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn file_store_round_trips_records_on_disk() -> TestResult {
    let dir = tempfile::tempdir()?;
    let store = FileTaskStore::open(Arc::new(RealFileSystem), dir.path().join("tasks"))?;

    let record = TaskRecordBuilder::new(TaskKind::PasswordHash)
        .input(json!({ "password": "pw", "saltRounds": 4 }))
        .succeeded(json!({ "hash": "abc" }))
        .build();
    store.put(&record)?;

    let path = dir.path().join("tasks").join(format!("{}.json", record.id));
    let on_disk = std::fs::read_to_string(&path)?;
    assert!(on_disk.contains("\"submittedAt\""));
    assert!(on_disk.contains("\"password-hash\""));

    assert_eq!(store.get(&record.id)?, Some(record.clone()));
    let loaded = store.get_all()?;
    assert_eq!(loaded.records, vec![record]);
    assert!(loaded.failures.is_empty());
    Ok(())
}

#[test]
fn put_overwrites_the_previous_record() -> TestResult {
    let fs = MockFileSystem::new();
    let store = FileTaskStore::open(Arc::new(fs.clone()), PathBuf::from("store"))?;

    let queued = TaskRecordBuilder::new(TaskKind::Example).build();
    let done = TaskRecordBuilder::new(TaskKind::Example)
        .id(queued.id)
        .succeeded(json!("done"))
        .build();
    store.put(&queued)?;
    store.put(&done)?;

    assert_eq!(fs.file_count(), 1);
    assert_eq!(store.get(&queued.id)?.unwrap().status, TaskStatus::Success);
    Ok(())
}

#[test]
fn unreadable_records_are_reported_individually() -> TestResult {
    let fs = MockFileSystem::new();
    let store = FileTaskStore::open(Arc::new(fs.clone()), PathBuf::from("store"))?;

    let good = TaskRecordBuilder::new(TaskKind::Example).build();
    store.put(&good)?;
    fs.add_file("store/garbage.json", "{ not json");
    fs.add_file("store/notes.txt", "ignored");

    let loaded = store.get_all()?;
    assert_eq!(loaded.records, vec![good]);
    assert_eq!(loaded.failures.len(), 1);
    Ok(())
}

#[test]
fn clear_removes_records_but_keeps_the_store_usable() -> TestResult {
    let dir = tempfile::tempdir()?;
    let store = FileTaskStore::open(Arc::new(RealFileSystem), dir.path().to_path_buf())?;
    for _ in 0..3 {
        store.put(&TaskRecordBuilder::new(TaskKind::Example).build())?;
    }

    store.clear()?;
    assert!(store.get_all()?.records.is_empty());
    assert!(dir.path().exists());

    let record = TaskRecordBuilder::new(TaskKind::Example).build();
    store.put(&record)?;
    assert_eq!(store.get_all()?.records.len(), 1);
    Ok(())
}

#[test]
fn missing_record_is_none() -> TestResult {
    let store = MemoryTaskStore::new();
    assert_eq!(store.get(&taskrunner::task::TaskId::new())?, None);
    Ok(())
}

#[tokio::test]
async fn sink_applies_operations_in_order() -> TestResult {
    let store = Arc::new(MemoryTaskStore::new());
    let (sink, writer) = PersistenceSink::spawn(store.clone());

    let first = TaskRecordBuilder::new(TaskKind::Example).build();
    let second = TaskRecordBuilder::new(TaskKind::Example).build();
    sink.put(first.clone());
    sink.clear();
    sink.put(second.clone());
    sink.flush().await;

    assert_eq!(store.get(&first.id)?, None);
    assert_eq!(store.get(&second.id)?, Some(second));

    drop(sink);
    writer.await?;
    Ok(())
}

#[tokio::test]
async fn failing_writes_do_not_block_scheduling() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let store = Arc::new(FileTaskStore::open(Arc::new(fs.clone()), PathBuf::from("store"))?);
    fs.set_fail_writes(true);

    let controller = ExecutorController::new();
    let service = start_controlled(&controller, 3, store);
    let client = service.client();

    with_timeout(async {
        let id = client.submit(TaskKind::Example, json!("x")).await?;
        controller.wait_started(1).await;
        controller.succeed(id, json!("done"));
        let snapshot = client
            .wait_for(|s| s.get(&id).is_some_and(|t| t.status == TaskStatus::Success))
            .await?;
        assert_eq!(snapshot.get(&id).unwrap().result, Some(json!("done")));
        client.flush().await?;
        Ok::<(), Box<dyn Error>>(())
    })
    .await?;

    assert_eq!(fs.file_count(), 0);
    service.shutdown().await?;
    Ok(())
}
