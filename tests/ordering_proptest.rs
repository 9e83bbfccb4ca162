// tests/ordering_proptest.rs

mod common;
use crate::common::{at_ms, planner, NotificationBuilder, W_MS};

use backup_sentinel::store::{EventStore, SqliteStore};
use backup_sentinel::types::{EventKind, NotificationState};
use proptest::prelude::*;

// Small path and size alphabets so merges and suppressions actually happen.
fn notification_strategy() -> impl Strategy<Value = (EventKind, usize, usize, i64, i64)> {
    (
        prop::sample::select(EventKind::ALL.to_vec()),
        0..3usize,
        0..3usize,
        0..2i64,
        0..(3 * W_MS),
    )
}

fn build_store(rows: &[(EventKind, usize, usize, i64, i64)]) -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    for (kind, dir, file, size, offset) in rows {
        NotificationBuilder::new(*kind, &format!("d{dir}/f{file}.bin"))
            .size(*size)
            .at_ms(*offset)
            .insert_into(&store);
    }
    store
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn candidates_are_sorted_by_time_then_id(
        rows in proptest::collection::vec(notification_strategy(), 0..24)
    ) {
        let store = build_store(&rows);
        let batch = planner().next_batch(&store, at_ms(10 * W_MS)).unwrap();

        // Merged rows keep the delete's position, so the sort key is stable.
        for pair in batch.candidates.windows(2) {
            let a = (pair[0].occurred_at(), pair[0].id);
            let b = (pair[1].occurred_at(), pair[1].id);
            prop_assert!(a < b, "{:?} before {:?}", a, b);
        }
        for c in &batch.candidates {
            prop_assert_eq!(store.get(c.id).unwrap().state, NotificationState::Pending);
        }
    }

    #[test]
    fn repeated_passes_drain_the_backlog(
        rows in proptest::collection::vec(notification_strategy(), 1..24)
    ) {
        let store = build_store(&rows);
        let now = at_ms(10 * W_MS);

        // Marking every candidate processed must eventually resolve every row.
        for _ in 0..=rows.len() {
            let batch = planner().next_batch(&store, now).unwrap();
            for c in &batch.candidates {
                store.mark_processed(c.id).unwrap();
            }
        }
        let counts = store.state_counts().unwrap();
        prop_assert_eq!(counts.pending, 0);
        prop_assert_eq!(counts.processed + counts.skipped, rows.len() as u64);
    }
}
