pub mod builders;
pub mod fake_executor;

use std::sync::{Arc, Once};

use tracing_subscriber::{EnvFilter, fmt};

use taskrunner::engine::{ServiceOptions, TaskService};
use taskrunner::exec::ExecutorRegistry;
use taskrunner::store::{MemoryTaskStore, TaskStore};
use taskrunner::task::TaskKind;

use crate::fake_executor::ExecutorController;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Options used by most runtime tests: a short cancel grace period keeps
/// "stubborn executor" tests fast.
pub fn test_options(max_concurrency: usize) -> ServiceOptions {
    ServiceOptions {
        max_concurrency,
        cancel_grace: std::time::Duration::from_millis(50),
        ..ServiceOptions::default()
    }
}

/// Start a service whose every kind is served by `controller`.
pub fn start_controlled(
    controller: &ExecutorController,
    max_concurrency: usize,
    store: Arc<dyn TaskStore>,
) -> TaskService {
    let mut executors = ExecutorRegistry::new();
    for kind in TaskKind::ALL {
        executors.register(controller.executor(kind));
    }
    TaskService::start(test_options(max_concurrency), executors, store)
}

/// Same as [`start_controlled`] with a fresh in-memory store.
pub fn start_in_memory(controller: &ExecutorController, max_concurrency: usize) -> TaskService {
    start_controlled(controller, max_concurrency, Arc::new(MemoryTaskStore::new()))
}
