// src/store/model.rs

use chrono::{DateTime, TimeZone, Utc};

use crate::errors::{Result, SentinelError};
use crate::types::{EventKind, NotificationState};

/// A canonical notification as accepted from the producer side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Time reported by the upstream source; drives all windowing.
    pub occurred_at: DateTime<Utc>,
    pub kind: EventKind,
    /// Original vocabulary token, kept for audit after `kind` is rewritten.
    pub raw_kind: String,
    pub directory: String,
    pub path: String,
    /// Pre-merge path for coalesced moves; empty otherwise unless the source
    /// supplies one.
    pub old_path: String,
    /// Byte size at notification time, 0 when unknown.
    pub size: i64,
    /// Action file carried by this notification.
    pub action_ref: Option<String>,
}

impl Notification {
    /// Minimal notification with the raw kind defaulted to the canonical token.
    pub fn new(
        occurred_at: DateTime<Utc>,
        kind: EventKind,
        path: impl Into<String>,
    ) -> Self {
        Self {
            occurred_at,
            kind,
            raw_kind: kind.as_str().to_string(),
            directory: String::new(),
            path: path.into(),
            old_path: String::new(),
            size: 0,
            action_ref: None,
        }
    }

    /// Structural completeness check applied before insertion.
    ///
    /// Fills an empty `directory` from the parent of `path`; semantic
    /// correctness of paths is not checked.
    pub fn validated(mut self) -> Result<Self> {
        if self.path.trim().is_empty() {
            return Err(SentinelError::Integrity(
                "notification has an empty path".to_string(),
            ));
        }
        if self.raw_kind.trim().is_empty() {
            return Err(SentinelError::Integrity(format!(
                "notification for {} has an empty raw kind",
                self.path
            )));
        }
        if self.size < 0 {
            return Err(SentinelError::Integrity(format!(
                "notification for {} has a negative size ({})",
                self.path, self.size
            )));
        }
        if self.directory.is_empty() {
            self.directory = parent_of(&self.path);
        }
        // Storage keeps millisecond precision; truncate so reads compare equal.
        self.occurred_at = truncate_to_millis(self.occurred_at);
        Ok(self)
    }

    /// Last path component, accepting both `/` and `\` separators since
    /// upstream paths may come from another platform.
    pub fn basename(&self) -> &str {
        basename(&self.path)
    }
}

/// A notification as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNotification {
    pub id: i64,
    pub state: NotificationState,
    pub notification: Notification,
}

impl StoredNotification {
    pub fn kind(&self) -> EventKind {
        self.notification.kind
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.notification.occurred_at
    }

    pub fn path(&self) -> &str {
        &self.notification.path
    }

    /// The in-memory shape after a delete->move merge: the persisted row is
    /// rewritten the same way in the same pass.
    pub fn into_move(mut self, new_path: String) -> Self {
        let n = &mut self.notification;
        n.old_path = std::mem::replace(&mut n.path, new_path);
        n.kind = EventKind::Move;
        self
    }
}

/// Per-state row counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCounts {
    pub pending: u64,
    pub processed: u64,
    pub skipped: u64,
}

pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}

fn parent_of(path: &str) -> String {
    let trimmed = path.trim_end_matches(['/', '\\']);
    match trimmed.rfind(['/', '\\']) {
        Some(idx) => trimmed[..idx].to_string(),
        None => ".".to_string(),
    }
}

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single().ok_or_else(|| {
        SentinelError::StoreUnavailable(format!("stored event_time {ms} is out of range"))
    })
}

fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts.timestamp_millis())
        .single()
        .unwrap_or(ts)
}
