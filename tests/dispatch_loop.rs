// tests/dispatch_loop.rs

mod common;
use crate::common::{
    at_ms, fake_dispatcher, init_tracing, planner, with_timeout, ConfigFileBuilder,
    FakeActionRunner, FlakyStore, NotificationBuilder,
};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use backup_sentinel::action::{
    ActionChain, ActionFileCache, DefaultAction, PerNotificationFile, ShellActionRunner,
};
use backup_sentinel::dispatch::Dispatcher;
use backup_sentinel::store::{EventStore, SqliteStore};
use backup_sentinel::types::NotificationState;

type TestResult = Result<(), Box<dyn Error>>;

fn late() -> chrono::DateTime<chrono::Utc> {
    at_ms(60_000)
}

#[tokio::test]
async fn failed_action_stays_pending_and_is_retried() -> TestResult {
    init_tracing();
    let store = Arc::new(SqliteStore::open_in_memory()?);
    let ok = NotificationBuilder::create("/d/ok.txt").at_ms(0).insert_into(&*store);
    let bad = NotificationBuilder::create("/d/bad.txt").at_ms(10).insert_into(&*store);
    let after = NotificationBuilder::create("/d/after.txt").at_ms(20).insert_into(&*store);

    let runner = FakeActionRunner::new();
    runner.fail_for(bad);
    let dispatcher = fake_dispatcher(Arc::clone(&store), runner.clone());

    let report = dispatcher.run_tick_at(late()).await?;
    assert_eq!(report.dispatched, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(runner.executed_ids(), vec![ok, bad, after]);
    assert_eq!(store.get(bad)?.state, NotificationState::Pending);
    assert_eq!(store.get(after)?.state, NotificationState::Processed);

    runner.succeed_for(bad);
    runner.clear();
    let retry = dispatcher.run_tick_at(late()).await?;
    assert_eq!(retry.dispatched, 1);
    assert_eq!(runner.executed_ids(), vec![bad]);
    assert_eq!(store.state_counts()?.pending, 0);
    Ok(())
}

#[tokio::test]
async fn unresolved_action_leaves_notification_pending() -> TestResult {
    let store = Arc::new(SqliteStore::open_in_memory()?);
    let id = NotificationBuilder::modify("/d/x").at_ms(0).insert_into(&*store);

    let runner = FakeActionRunner::new();
    let dispatcher = Dispatcher::new(
        Arc::clone(&store),
        planner(),
        ActionChain::new(),
        runner.clone(),
        Duration::from_millis(10),
    );

    for _ in 0..3 {
        let report = dispatcher.run_tick_at(late()).await?;
        assert_eq!(report.unresolved, 1);
    }
    assert!(runner.executed().is_empty());
    assert_eq!(store.get(id)?.state, NotificationState::Pending);
    Ok(())
}

#[tokio::test]
async fn rendered_command_uses_move_paths() -> TestResult {
    let store = Arc::new(SqliteStore::open_in_memory()?);
    NotificationBuilder::delete("/a/pic.jpg").size(3).at_ms(0).insert_into(&*store);
    NotificationBuilder::create("/b/pic.jpg").size(3).at_ms(50).insert_into(&*store);

    let runner = FakeActionRunner::new();
    let actions = ActionChain::new().push(DefaultAction::new("mirror %oldfullfile% %fullfile%"));
    let dispatcher = Dispatcher::new(
        Arc::clone(&store),
        planner(),
        actions,
        runner.clone(),
        Duration::from_millis(10),
    );
    dispatcher.run_tick_at(late()).await?;

    let executed = runner.executed();
    assert_eq!(executed.len(), 1);
    if cfg!(unix) {
        assert_eq!(executed[0].1, "mirror '/a/pic.jpg' '/b/pic.jpg'");
    }
    Ok(())
}

#[tokio::test]
async fn store_outage_aborts_the_tick_only() -> TestResult {
    init_tracing();
    let store = Arc::new(FlakyStore::new());
    let id = NotificationBuilder::create("/d/a").at_ms(0).insert_into(&*store);

    let runner = FakeActionRunner::new();
    let dispatcher = fake_dispatcher(Arc::clone(&store), runner.clone());

    store.fail_reads(true);
    assert!(dispatcher.run_tick_at(late()).await.is_err());
    assert!(runner.executed().is_empty());

    store.fail_reads(false);
    let report = dispatcher.run_tick_at(late()).await?;
    assert_eq!(report.dispatched, 1);
    assert_eq!(store.get(id)?.state, NotificationState::Processed);
    Ok(())
}

#[tokio::test]
async fn failed_state_write_aborts_the_rest_of_the_tick() -> TestResult {
    init_tracing();
    let store = Arc::new(FlakyStore::new());
    let first = NotificationBuilder::create("/d/a").at_ms(0).insert_into(&*store);
    let second = NotificationBuilder::create("/d/b").at_ms(10).insert_into(&*store);

    let runner = FakeActionRunner::new();
    let dispatcher = fake_dispatcher(Arc::clone(&store), runner.clone());

    store.fail_marks(true);
    assert!(dispatcher.run_tick_at(late()).await.is_err());
    assert_eq!(runner.executed_ids(), vec![first]);
    assert_eq!(store.get(first)?.state, NotificationState::Pending);
    assert_eq!(store.get(second)?.state, NotificationState::Pending);

    // At-least-once: the first action runs again once the store recovers.
    store.fail_marks(false);
    runner.clear();
    let report = dispatcher.run_tick_at(late()).await?;
    assert_eq!(report.dispatched, 2);
    assert_eq!(runner.executed_ids(), vec![first, second]);
    Ok(())
}

#[tokio::test]
async fn expired_action_files_are_evicted_between_ticks() -> TestResult {
    let dir = tempfile::tempdir()?;
    let own = dir.path().join("own.json");
    std::fs::write(&own, r#"{"add_cmd":"own %fullfile%"}"#)?;

    let store = Arc::new(SqliteStore::open_in_memory()?);
    NotificationBuilder::create("/d/a")
        .action_ref(own.to_str().ok_or("non-utf8 temp path")?)
        .at_ms(0)
        .insert_into(&*store);

    let cache = Arc::new(ActionFileCache::new(Duration::ZERO));
    let runner = FakeActionRunner::new();
    let dispatcher = Dispatcher::new(
        Arc::clone(&store),
        planner(),
        ActionChain::new().push(PerNotificationFile::new(Arc::clone(&cache))),
        runner.clone(),
        Duration::from_millis(10),
    );

    assert_eq!(dispatcher.run_tick_at(late()).await?.dispatched, 1);
    assert_eq!(cache.len(), 1);

    dispatcher.run_tick_at(late()).await?;
    assert!(cache.is_empty());
    Ok(())
}

#[tokio::test]
async fn run_until_stops_on_shutdown() -> TestResult {
    let store = Arc::new(SqliteStore::open_in_memory()?);
    let dispatcher = fake_dispatcher(Arc::clone(&store), FakeActionRunner::new());

    let shutdown = tokio::time::sleep(Duration::from_millis(50));
    with_timeout(dispatcher.run_until(shutdown)).await?;
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn shell_runner_end_to_end_with_config() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let log = dir.path().join("dispatched.log");
    let cfg = ConfigFileBuilder::new()
        .db_path(dir.path().join("sentinel.db"))
        .default_action(&format!("echo %fullfile% >> '{}'", log.display()))
        .build();

    let store = Arc::new(SqliteStore::open(&cfg.store.path, cfg.store.busy_timeout())?);
    let id = NotificationBuilder::create("/data/with space.txt")
        .at_ms(0)
        .insert_into(&*store);

    let dispatcher = Dispatcher::from_config(
        Arc::clone(&store),
        &cfg,
        ShellActionRunner::new(Some(Duration::from_secs(5))),
    )?;
    let report = dispatcher.run_tick_at(late()).await?;

    assert_eq!(report.dispatched, 1);
    assert_eq!(store.get(id)?.state, NotificationState::Processed);
    assert_eq!(std::fs::read_to_string(&log)?.trim(), "/data/with space.txt");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn non_zero_exit_is_a_failure() -> TestResult {
    let store = Arc::new(SqliteStore::open_in_memory()?);
    let id = NotificationBuilder::delete("/d/gone").at_ms(0).insert_into(&*store);

    let actions = ActionChain::new().push(DefaultAction::new("exit 4; %fullfile%"));
    let dispatcher = Dispatcher::new(
        Arc::clone(&store),
        planner(),
        actions,
        ShellActionRunner::default(),
        Duration::from_millis(10),
    );
    let report = dispatcher.run_tick_at(late()).await?;

    assert_eq!(report.failed, 1);
    assert_eq!(store.get(id)?.state, NotificationState::Pending);
    Ok(())
}
