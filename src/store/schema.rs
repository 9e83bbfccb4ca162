// src/store/schema.rs

//! SQLite schema for the notification store.
//!
//! Conventions:
//! - `event_time` is epoch milliseconds, so ordering and range scans are
//!   numeric rather than string comparisons.
//! - `processed`: 0 = pending, 1 = processed, 2 = skipped.
//! - Rows are never deleted; they form the audit trail.

use rusqlite::Connection;

use crate::errors::{store_error, Result};

/// Pragmas applied to file-backed databases. WAL keeps a half-written
/// transaction invisible to readers in other processes.
pub const FILE_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
"#;

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    event_time     INTEGER NOT NULL,             -- epoch ms, source time
    event_type     TEXT    NOT NULL,             -- CREATE | MODIFY | RENAME | MOVE | DELETE
    raw_event_type TEXT    NOT NULL,
    dir_path       TEXT    NOT NULL,
    file_path      TEXT    NOT NULL,
    old_file_path  TEXT    NOT NULL DEFAULT '',
    size           INTEGER NOT NULL DEFAULT 0,
    action_ref     TEXT,
    processed      INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_events_pending_time
    ON events(processed, event_time, id);
"#;

/// Column list shared by every SELECT so `row_to_notification` can rely on
/// positions.
pub const EVENT_COLUMNS: &str = "id, event_time, event_type, raw_event_type, dir_path, \
     file_path, old_file_path, size, action_ref, processed";

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)
        .map_err(store_error("creating events table"))
}
