// tests/store_roundtrip.rs

mod common;
use crate::common::{at_ms, init_tracing, temp_store, NotificationBuilder};

use std::time::Duration;

use backup_sentinel::errors::SentinelError;
use backup_sentinel::store::{EventStore, SqliteStore};
use backup_sentinel::types::{EventKind, NotificationState};

#[test]
fn inserted_rows_read_back_identically() {
    init_tracing();
    let (_dir, store) = temp_store();

    let samples = [
        NotificationBuilder::create("/srv/photos/1.jpg").size(2048).at_ms(0),
        NotificationBuilder::rename("/srv/photos/2.jpg")
            .old_path("/srv/photos/2-old.jpg")
            .raw_kind("重命名")
            .at_ms(10),
        NotificationBuilder::delete(r"\\nas\share\a b\3.jpg")
            .action_ref("/etc/sentinel/actions.json")
            .at_ms(20),
    ];

    for builder in samples {
        let original = builder.build();
        let id = store.insert(&original).unwrap();
        let read = store.get(id).unwrap();

        assert_eq!(read.state, NotificationState::Pending);
        assert_eq!(read.notification.kind, original.kind);
        assert_eq!(read.notification.path, original.path);
        assert_eq!(read.notification.old_path, original.old_path);
        assert_eq!(read.notification.raw_kind, original.raw_kind);
        assert_eq!(read.notification.size, original.size);
        assert_eq!(read.notification.action_ref, original.action_ref);
        assert_eq!(read.notification.occurred_at, original.occurred_at);
    }
}

#[test]
fn rows_survive_reopening_the_file() {
    let (dir, store) = temp_store();
    let id = NotificationBuilder::modify("/a/b.txt").insert_into(&store);
    store.mark_processed(id).unwrap();
    drop(store);

    let reopened =
        SqliteStore::open(dir.path().join("sentinel.db"), Duration::from_secs(1)).unwrap();
    let row = reopened.get(id).unwrap();
    assert_eq!(row.state, NotificationState::Processed);
    assert_eq!(row.kind(), EventKind::Modify);

    let next = NotificationBuilder::modify("/a/c.txt").insert_into(&reopened);
    assert!(next > id, "ids are never reused");
}

#[test]
fn second_connection_sees_committed_rows() {
    let (dir, producer) = temp_store();
    let consumer =
        SqliteStore::open(dir.path().join("sentinel.db"), Duration::from_secs(1)).unwrap();

    let id = NotificationBuilder::create("/x/y.bin").at_ms(0).insert_into(&producer);

    let window = consumer
        .pending_between(at_ms(0), at_ms(1_000))
        .unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].id, id);

    consumer.mark_processed(id).unwrap();
    assert!(matches!(
        producer.mark_processed(id),
        Err(SentinelError::Conflict { .. })
    ));
}

#[test]
fn terminal_and_missing_rows_conflict_without_mutation() {
    let (_dir, store) = temp_store();
    let id = NotificationBuilder::create("/x").insert_into(&store);
    store.mark_skipped(id).unwrap();

    match store.mark_processed(id) {
        Err(SentinelError::Conflict { id: got, reason }) => {
            assert_eq!(got, id);
            assert!(reason.contains("skipped"), "reason was {reason}");
        }
        other => panic!("expected Conflict, got {other:?}"),
    }
    assert_eq!(store.get(id).unwrap().state, NotificationState::Skipped);

    assert!(matches!(
        store.mark_skipped(9_999),
        Err(SentinelError::Conflict { id: 9_999, .. })
    ));
    assert!(matches!(store.get(9_999), Err(SentinelError::NotFound(9_999))));
}

#[test]
fn incomplete_notifications_are_rejected() {
    let (_dir, store) = temp_store();
    let no_path = NotificationBuilder::create("").build();
    let no_raw_kind = NotificationBuilder::create("/a").raw_kind("").build();

    assert!(matches!(store.insert(&no_path), Err(SentinelError::Integrity(_))));
    assert!(matches!(store.insert(&no_raw_kind), Err(SentinelError::Integrity(_))));
    assert_eq!(store.state_counts().unwrap().pending, 0);
}

#[test]
fn unwritable_location_is_store_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the database's parent directory should be.
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();

    let res = SqliteStore::open(blocker.join("sentinel.db"), Duration::from_secs(1));
    assert!(matches!(res, Err(SentinelError::StoreUnavailable(_))));
}
