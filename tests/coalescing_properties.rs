// tests/coalescing_properties.rs

mod common;
use crate::common::{
    at_ms, fake_dispatcher, init_tracing, planner, FakeActionRunner, FlakyStore,
    NotificationBuilder, W_MS,
};

use std::sync::Arc;

use backup_sentinel::store::{EventStore, SqliteStore};
use backup_sentinel::types::{EventKind, NotificationState};

/// Far enough after every test row that the whole backlog is eligible.
fn late() -> chrono::DateTime<chrono::Utc> {
    at_ms(60_000)
}

#[test]
fn delete_then_create_within_half_window_becomes_one_move() {
    init_tracing();
    let store = SqliteStore::open_in_memory().unwrap();
    let del = NotificationBuilder::delete("dir/1.jpg").size(10).at_ms(0).insert_into(&store);
    let crt = NotificationBuilder::create("dir/1.jpg")
        .size(10)
        .at_ms(W_MS / 4)
        .insert_into(&store);

    let batch = planner().next_batch(&store, late()).unwrap();

    assert_eq!(batch.candidates.len(), 1);
    let moved = &batch.candidates[0];
    assert_eq!(moved.id, del);
    assert_eq!(moved.kind(), EventKind::Move);
    assert_eq!(moved.path(), "dir/1.jpg");
    assert_eq!(moved.notification.old_path, "dir/1.jpg");
    assert_eq!(moved.notification.raw_kind, "DELETE");
    assert_eq!(store.get(crt).unwrap().state, NotificationState::Skipped);
    assert_eq!(store.state_counts().unwrap().skipped, 1);
}

#[tokio::test]
async fn pair_outside_window_is_dispatched_separately_in_order() {
    init_tracing();
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let del = NotificationBuilder::delete("a/1.jpg").size(10).at_ms(0).insert_into(&*store);
    let crt = NotificationBuilder::create("b/1.jpg")
        .size(10)
        .at_ms(W_MS * 3 / 2)
        .insert_into(&*store);

    let runner = FakeActionRunner::new();
    let dispatcher = fake_dispatcher(Arc::clone(&store), runner.clone());

    let mut ticks = 0;
    while store.state_counts().unwrap().pending > 0 {
        dispatcher.run_tick_at(late()).await.unwrap();
        ticks += 1;
        assert!(ticks < 5, "backlog did not drain");
    }

    assert_eq!(runner.executed_ids(), vec![del, crt]);
    assert_eq!(store.get(del).unwrap().kind(), EventKind::Delete);
    assert_eq!(store.get(crt).unwrap().kind(), EventKind::Create);
    assert_eq!(store.state_counts().unwrap().processed, 2);
}

#[tokio::test]
async fn second_pass_over_a_resolved_window_is_empty() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    NotificationBuilder::delete("p/x.png").size(1).at_ms(0).insert_into(&*store);
    NotificationBuilder::create("q/x.png").size(1).at_ms(100).insert_into(&*store);
    NotificationBuilder::rename("r/y.txt").at_ms(200).insert_into(&*store);
    NotificationBuilder::modify("r/y.txt").at_ms(300).insert_into(&*store);
    NotificationBuilder::modify("s/z.txt").at_ms(400).insert_into(&*store);

    let dispatcher = fake_dispatcher(Arc::clone(&store), FakeActionRunner::new());
    let first = dispatcher.run_tick_at(late()).await.unwrap();
    assert_eq!(first.candidates, 3);
    assert_eq!(first.dispatched, 3);
    assert_eq!(first.merged, 1);
    assert_eq!(first.suppressed, 1);

    let second = planner().next_batch(&*store, late()).unwrap();
    assert!(second.is_empty());
    assert_eq!(store.state_counts().unwrap().pending, 0);
}

#[test]
fn rename_absorbs_same_path_modify_only() {
    let store = SqliteStore::open_in_memory().unwrap();
    let ren = NotificationBuilder::rename("d/new.txt").at_ms(0).insert_into(&store);
    let same = NotificationBuilder::modify("d/new.txt").at_ms(500).insert_into(&store);
    let other = NotificationBuilder::modify("d/elsewhere.txt").at_ms(600).insert_into(&store);
    let late_modify = NotificationBuilder::modify("d/new.txt")
        .at_ms(W_MS + 1)
        .insert_into(&store);

    let batch = planner().next_batch(&store, late()).unwrap();
    let ids: Vec<i64> = batch.candidates.iter().map(|c| c.id).collect();

    assert_eq!(ids, vec![ren, other]);
    assert_eq!(store.get(same).unwrap().state, NotificationState::Skipped);
    // Beyond W of the rename: neither suppressed nor dispatched yet.
    assert_eq!(store.get(late_modify).unwrap().state, NotificationState::Pending);
}

#[test]
fn failed_conversion_defers_both_rows_until_it_succeeds() {
    init_tracing();
    let store = FlakyStore::new();
    let del = NotificationBuilder::delete("a/f.raw").size(7).at_ms(0).insert_into(&store);
    let crt = NotificationBuilder::create("b/f.raw").size(7).at_ms(200).insert_into(&store);
    let tail = NotificationBuilder::modify("c/g.txt").at_ms(300).insert_into(&store);

    store.fail_convert(true);
    let batch = planner().next_batch(&store, late()).unwrap();
    let ids: Vec<i64> = batch.candidates.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![tail]);
    assert_eq!(batch.deferred, 2);
    assert_eq!(store.get(del).unwrap().state, NotificationState::Pending);
    assert_eq!(store.get(del).unwrap().kind(), EventKind::Delete);
    assert_eq!(store.get(crt).unwrap().state, NotificationState::Pending);

    // The tail was dispatched in the meantime.
    store.mark_processed(tail).unwrap();

    store.fail_convert(false);
    let retry = planner().next_batch(&store, late()).unwrap();
    assert_eq!(retry.candidates.len(), 1);
    assert_eq!(retry.candidates[0].id, del);
    assert_eq!(retry.candidates[0].kind(), EventKind::Move);
    assert_eq!(store.convert_calls(), 2);
}

#[test]
fn failed_suppression_still_emits_the_rename() {
    let store = FlakyStore::new();
    let ren = NotificationBuilder::rename("d/a.txt").at_ms(0).insert_into(&store);
    let modify = NotificationBuilder::modify("d/a.txt").at_ms(100).insert_into(&store);

    store.fail_skip(true);
    let batch = planner().next_batch(&store, late()).unwrap();
    let ids: Vec<i64> = batch.candidates.iter().map(|c| c.id).collect();

    assert_eq!(ids, vec![ren]);
    assert_eq!(batch.suppressed, 0);
    assert_eq!(store.get(modify).unwrap().state, NotificationState::Pending);
}

#[test]
fn nothing_is_selected_until_rows_are_two_windows_old() {
    let store = SqliteStore::open_in_memory().unwrap();
    NotificationBuilder::create("fresh.txt").at_ms(0).insert_into(&store);

    let too_soon = planner().next_batch(&store, at_ms(2 * W_MS)).unwrap();
    assert!(too_soon.is_empty());

    let eligible = planner().next_batch(&store, at_ms(2 * W_MS + 1)).unwrap();
    assert_eq!(eligible.candidates.len(), 1);
}
