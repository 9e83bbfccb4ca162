// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical kind of a filesystem notification.
///
/// `Rename` and `Move` are distinct at ingestion; the coalescer may rewrite a
/// `Delete` into a `Move` when it finds the matching `Create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    Create,
    Modify,
    Rename,
    Move,
    Delete,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Create,
        EventKind::Modify,
        EventKind::Rename,
        EventKind::Move,
        EventKind::Delete,
    ];

    /// Token persisted in the `event_type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Create => "CREATE",
            EventKind::Modify => "MODIFY",
            EventKind::Rename => "RENAME",
            EventKind::Move => "MOVE",
            EventKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CREATE" => Ok(EventKind::Create),
            "MODIFY" => Ok(EventKind::Modify),
            "RENAME" => Ok(EventKind::Rename),
            "MOVE" => Ok(EventKind::Move),
            "DELETE" => Ok(EventKind::Delete),
            other => Err(format!(
                "invalid event kind: {other} (expected CREATE, MODIFY, RENAME, MOVE or DELETE)"
            )),
        }
    }
}

/// Lifecycle of a stored notification.
///
/// Transitions are one-way: `Pending -> Processed` or `Pending -> Skipped`.
/// The discriminants are the values stored in the `processed` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationState {
    Pending = 0,
    Processed = 1,
    Skipped = 2,
}

impl NotificationState {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(NotificationState::Pending),
            1 => Some(NotificationState::Processed),
            2 => Some(NotificationState::Skipped),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, NotificationState::Pending)
    }
}

impl Default for NotificationState {
    fn default() -> Self {
        NotificationState::Pending
    }
}

impl fmt::Display for NotificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationState::Pending => "pending",
            NotificationState::Processed => "processed",
            NotificationState::Skipped => "skipped",
        };
        f.write_str(s)
    }
}
