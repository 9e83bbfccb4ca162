use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use backup_sentinel::errors::{Result, SentinelError};
use backup_sentinel::store::{
    EventStore, Notification, SqliteStore, StateCounts, StoredNotification,
};
use chrono::{DateTime, Utc};

/// An in-memory `SqliteStore` with switchable failures, for exercising the
/// coalescer's and dispatcher's error paths.
pub struct FlakyStore {
    inner: SqliteStore,
    fail_convert: AtomicBool,
    fail_skip: AtomicBool,
    fail_reads: AtomicBool,
    fail_marks: AtomicBool,
    convert_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().expect("opening in-memory store"),
            fail_convert: AtomicBool::new(false),
            fail_skip: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            fail_marks: AtomicBool::new(false),
            convert_calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &SqliteStore {
        &self.inner
    }

    pub fn fail_convert(&self, fail: bool) {
        self.fail_convert.store(fail, Ordering::SeqCst);
    }

    pub fn fail_skip(&self, fail: bool) {
        self.fail_skip.store(fail, Ordering::SeqCst);
    }

    /// Make window reads fail as if the database were unavailable.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `mark_processed` fail as if the database were unavailable.
    pub fn fail_marks(&self, fail: bool) {
        self.fail_marks.store(fail, Ordering::SeqCst);
    }

    pub fn convert_calls(&self) -> usize {
        self.convert_calls.load(Ordering::SeqCst)
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SentinelError::StoreUnavailable(
                "simulated read failure".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for FlakyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for FlakyStore {
    fn insert(&self, notification: &Notification) -> Result<i64> {
        self.inner.insert(notification)
    }

    fn get(&self, id: i64) -> Result<StoredNotification> {
        self.inner.get(id)
    }

    fn earliest_pending_before(&self, cutoff: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        self.check_reads()?;
        self.inner.earliest_pending_before(cutoff)
    }

    fn pending_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StoredNotification>> {
        self.check_reads()?;
        self.inner.pending_between(from, to)
    }

    fn mark_processed(&self, id: i64) -> Result<()> {
        if self.fail_marks.load(Ordering::SeqCst) {
            return Err(SentinelError::StoreUnavailable(
                "simulated mark_processed failure".to_string(),
            ));
        }
        self.inner.mark_processed(id)
    }

    fn mark_skipped(&self, id: i64) -> Result<()> {
        if self.fail_skip.load(Ordering::SeqCst) {
            return Err(SentinelError::StoreUnavailable(
                "simulated mark_skipped failure".to_string(),
            ));
        }
        self.inner.mark_skipped(id)
    }

    fn convert_delete_to_move(
        &self,
        delete_id: i64,
        create_id: i64,
        old_path: &str,
        new_path: &str,
    ) -> Result<()> {
        self.convert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_convert.load(Ordering::SeqCst) {
            return Err(SentinelError::StoreUnavailable(
                "simulated conversion failure".to_string(),
            ));
        }
        self.inner
            .convert_delete_to_move(delete_id, create_id, old_path, new_path)
    }

    fn state_counts(&self) -> Result<StateCounts> {
        self.inner.state_counts()
    }
}
