// src/lib.rs

pub mod action;
pub mod cli;
pub mod coalesce;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod ingest;
pub mod logging;
pub mod store;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use tracing::{info, warn};

use crate::action::ShellActionRunner;
use crate::cli::{CliArgs, Mode};
use crate::coalesce::{Window, WindowSelector};
use crate::config::{load_for_cli, ConfigFile};
use crate::dispatch::Dispatcher;
use crate::ingest::{ingest_payload, spawn_watcher, IngestOutcome, SkipFilter};
use crate::store::{EventStore, SqliteStore, StateCounts};

/// High-level entry point used by `main.rs`.
///
/// Loads configuration once and hands an explicit `ConfigFile` to the mode
/// that the arguments select.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_for_cli(&args)?;

    match args.mode() {
        Mode::Producer => run_producer(&cfg, &args.payload),
        Mode::Consumer { once } => run_consumer(&cfg, once).await,
        Mode::Check => run_check(&cfg),
        Mode::Watch(dir) => run_watch(&cfg, &dir).await,
    }
}

fn open_store(cfg: &ConfigFile) -> Result<SqliteStore> {
    let store = SqliteStore::open(&cfg.store.path, cfg.store.busy_timeout())
        .with_context(|| format!("opening store {}", cfg.store.path.display()))?;
    Ok(store)
}

fn run_producer(cfg: &ConfigFile, payload: &[String]) -> Result<()> {
    let filter = SkipFilter::new(&cfg.ingest.skip_patterns)?;
    let store = open_store(cfg)?;

    match ingest_payload(&store, payload, &filter)? {
        IngestOutcome::Stored(id) => info!(id, "notification queued"),
        IngestOutcome::Skipped => info!("notification skipped"),
    }
    Ok(())
}

async fn run_consumer(cfg: &ConfigFile, once: bool) -> Result<()> {
    let store = Arc::new(open_store(cfg)?);
    let runner = ShellActionRunner::new(cfg.dispatch.action_timeout());
    let dispatcher = Dispatcher::from_config(store, cfg, runner)?;

    if once {
        let report = dispatcher.run_tick().await?;
        info!(?report, "single dispatch tick finished");
        return Ok(());
    }

    dispatcher.run_until(shutdown_signal()).await?;
    Ok(())
}

/// Print the pending window and per-state counts. Read-only: nothing is
/// coalesced or dispatched.
fn run_check(cfg: &ConfigFile) -> Result<()> {
    let store = open_store(cfg)?;
    let counts = store.state_counts()?;
    let window = WindowSelector::new(cfg.coalesce.window()).select(&store, Utc::now())?;

    print_check(&cfg.store.path, &counts, window.as_ref());
    Ok(())
}

fn print_check(db: &Path, counts: &StateCounts, window: Option<&Window>) {
    println!("store: {}", db.display());
    println!(
        "  pending = {}, processed = {}, skipped = {}",
        counts.pending, counts.processed, counts.skipped
    );

    let Some(window) = window else {
        println!("no pending notifications are old enough to evaluate");
        return;
    };

    println!(
        "pending window from {} ({} rows):",
        window.earliest.with_timezone(&Local).to_rfc3339(),
        window.len()
    );
    for entry in &window.entries {
        let n = &entry.notification;
        print!(
            "  id={} kind={} raw={} at={} path={}",
            entry.id,
            n.kind,
            n.raw_kind,
            n.occurred_at.with_timezone(&Local).to_rfc3339(),
            n.path
        );
        if !n.old_path.is_empty() {
            print!(" old_path={}", n.old_path);
        }
        if let Some(action_ref) = &n.action_ref {
            print!(" action_ref={action_ref}");
        }
        println!();
    }
}

/// Producer and consumer in one process. Each side gets its own connection;
/// SQLite transactions are the only synchronisation between them, exactly as
/// between separate processes.
async fn run_watch(cfg: &ConfigFile, dir: &Path) -> Result<()> {
    let filter = SkipFilter::new(&cfg.ingest.skip_patterns)?;
    let producer_store = Arc::new(open_store(cfg)?);
    let (watcher, ingest_task) = spawn_watcher(dir, producer_store, filter)?;
    info!(root = %watcher.root().display(), "watching for changes");

    let consumer_store = Arc::new(open_store(cfg)?);
    let runner = ShellActionRunner::new(cfg.dispatch.action_timeout());
    let dispatcher = Dispatcher::from_config(consumer_store, cfg, runner)?;
    dispatcher.run_until(shutdown_signal()).await?;

    drop(watcher);
    if let Err(err) = ingest_task.await {
        warn!(error = %err, "watcher task ended abnormally");
    }
    Ok(())
}

/// Resolves on Ctrl-C. If the signal handler cannot be installed the loop
/// runs until the process is killed.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
