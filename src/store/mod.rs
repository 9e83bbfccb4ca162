// src/store/mod.rs

//! Notification Store.
//!
//! One row per accepted notification plus its lifecycle state. The
//! [`EventStore`] trait is the seam the coalescer and dispatch loop talk to;
//! [`SqliteStore`] is the durable implementation. Producer and consumer may
//! be separate processes sharing the same database file: SQLite transactions
//! are the only synchronisation between them.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::errors::Result;

pub mod model;
pub mod schema;
pub mod sqlite;

pub use model::{basename, Notification, StateCounts, StoredNotification};
pub use sqlite::SqliteStore;

/// Storage operations required by the producer path, the window selector,
/// the coalescer and the dispatch loop.
pub trait EventStore: Send + Sync {
    /// Validate and append a new pending row, returning its id.
    fn insert(&self, notification: &Notification) -> Result<i64>;

    /// Fetch a row regardless of state. `NotFound` if absent.
    fn get(&self, id: i64) -> Result<StoredNotification>;

    /// Minimum `occurred_at` among pending rows strictly older than `cutoff`.
    fn earliest_pending_before(&self, cutoff: DateTime<Utc>) -> Result<Option<DateTime<Utc>>>;

    /// Pending rows with `occurred_at` in `[from, to]`, ordered by
    /// `(occurred_at, id)`.
    fn pending_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StoredNotification>>;

    /// `PENDING -> PROCESSED`. `Conflict` when zero rows change.
    fn mark_processed(&self, id: i64) -> Result<()>;

    /// `PENDING -> SKIPPED`. `Conflict` when zero rows change.
    fn mark_skipped(&self, id: i64) -> Result<()>;

    /// Rewrite the delete row into a move and skip the create row, atomically.
    fn convert_delete_to_move(
        &self,
        delete_id: i64,
        create_id: i64,
        old_path: &str,
        new_path: &str,
    ) -> Result<()>;

    fn state_counts(&self) -> Result<StateCounts>;
}

impl<S: EventStore + ?Sized> EventStore for Arc<S> {
    fn insert(&self, notification: &Notification) -> Result<i64> {
        (**self).insert(notification)
    }

    fn get(&self, id: i64) -> Result<StoredNotification> {
        (**self).get(id)
    }

    fn earliest_pending_before(&self, cutoff: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        (**self).earliest_pending_before(cutoff)
    }

    fn pending_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StoredNotification>> {
        (**self).pending_between(from, to)
    }

    fn mark_processed(&self, id: i64) -> Result<()> {
        (**self).mark_processed(id)
    }

    fn mark_skipped(&self, id: i64) -> Result<()> {
        (**self).mark_skipped(id)
    }

    fn convert_delete_to_move(
        &self,
        delete_id: i64,
        create_id: i64,
        old_path: &str,
        new_path: &str,
    ) -> Result<()> {
        (**self).convert_delete_to_move(delete_id, create_id, old_path, new_path)
    }

    fn state_counts(&self) -> Result<StateCounts> {
        (**self).state_counts()
    }
}
