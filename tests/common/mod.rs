#![allow(dead_code)]

pub use backup_sentinel_test_utils::builders::{self, at_ms, base_time};
pub use backup_sentinel_test_utils::{
    init_tracing, temp_store, with_timeout, ConfigFileBuilder, FakeActionRunner, FlakyStore,
    NotificationBuilder,
};

use std::sync::Arc;
use std::time::Duration;

use backup_sentinel::action::{ActionChain, DefaultAction};
use backup_sentinel::coalesce::BatchPlanner;
use backup_sentinel::dispatch::Dispatcher;
use backup_sentinel::store::EventStore;
use backup_sentinel::types::EventKind;
use chrono::TimeDelta;

/// Coalescing window used throughout the integration tests.
pub const W_MS: i64 = 2_000;

pub fn planner() -> BatchPlanner {
    BatchPlanner::new(TimeDelta::milliseconds(W_MS), vec![EventKind::Rename])
}

/// A dispatcher with a single default action and a recording runner.
pub fn fake_dispatcher<S: EventStore>(
    store: Arc<S>,
    runner: FakeActionRunner,
) -> Dispatcher<S, FakeActionRunner> {
    let actions = ActionChain::new().push(DefaultAction::new("backup %fullfile%"));
    Dispatcher::new(store, planner(), actions, runner, Duration::from_millis(10))
}
