// src/lib.rs

pub mod cli;
pub mod config;
pub mod console;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod scheduler;
pub mod store;
pub mod task;
pub mod types;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_or_default};
use crate::engine::{ServiceOptions, TaskClient, TaskService};
use crate::errors::TaskRunnerError;
use crate::exec::builtin_registry;
use crate::store::open_store;
use crate::types::StoreMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the durable store and start-up rehydration
/// - the runtime with its built-in executors
/// - Ctrl-C handling
/// - either `--once` mode or the interactive console
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref())?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    // Fail on malformed --submit values before anything is started.
    let submissions = args.submissions()?;

    let store = open_store(cfg.store.mode, &cfg.store.path)
        .with_context(|| format!("opening task store at {}", cfg.store.path.display()))?;
    let executors = builtin_registry(&cfg.executor.enabled, cfg.executor.step_delay());

    let service = TaskService::start(ServiceOptions::from(&cfg), executors, store);
    let client = service.client();

    // Ctrl-C → graceful shutdown.
    {
        let client = client.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = client.shutdown().await;
        });
    }

    for (kind, input) in submissions {
        let id = client.submit(kind, input).await?;
        println!("submitted {id} ({kind})");
    }

    if args.once {
        wait_for_completion(&client).await?;
    } else {
        console::run_console(client.clone()).await?;
    }

    drop(client);
    service.shutdown().await?;
    Ok(())
}

async fn wait_for_completion(client: &TaskClient) -> Result<()> {
    match client.wait_until_idle().await {
        Ok(snapshot) => {
            console::print_tasks(&snapshot);
            Ok(())
        }
        Err(TaskRunnerError::RuntimeClosed) => {
            info!("runtime stopped before all tasks finished");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Simple dry-run output: print the effective configuration.
fn print_dry_run(cfg: &ConfigFile) {
    println!("taskrunner dry-run");
    println!("  scheduler.max_concurrency = {}", cfg.scheduler.max_concurrency);
    match cfg.store.mode {
        StoreMode::File => println!("  store = file ({})", cfg.store.path.display()),
        StoreMode::Memory => println!("  store = memory"),
    }
    println!("  executor.step_delay_ms = {}", cfg.executor.step_delay_ms);
    println!("  executor.cancel_grace_ms = {}", cfg.executor.cancel_grace_ms);
    println!();

    println!("enabled kinds ({}):", cfg.executor.enabled.len());
    for kind in &cfg.executor.enabled {
        let note = if kind.payload_resumable() {
            ""
        } else {
            " (not restored after restart while unfinished)"
        };
        println!("  - {kind}{note}");
    }

    debug!("dry-run complete (no execution)");
}
