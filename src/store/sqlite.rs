// src/store/sqlite.rs

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::errors::{store_error, Result, SentinelError};
use crate::store::model::{from_millis, to_millis, Notification, StateCounts, StoredNotification};
use crate::store::schema::{init_schema, EVENT_COLUMNS, FILE_PRAGMAS};
use crate::store::EventStore;
use crate::types::{EventKind, NotificationState};

/// SQLite-backed [`EventStore`].
///
/// The connection sits behind a mutex so the store can be shared between the
/// watcher task and the dispatch loop; the guard is never held across an
/// `.await`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    location: PathBuf,
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) the database at `path` in WAL mode and ensure the
    /// schema exists. Safe to call from several processes at once.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    SentinelError::StoreUnavailable(format!(
                        "creating directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let conn = Connection::open(path).map_err(store_error("opening database"))?;
        conn.busy_timeout(busy_timeout)
            .map_err(store_error("setting busy timeout"))?;
        conn.execute_batch(FILE_PRAGMAS)
            .map_err(store_error("enabling WAL journal"))?;
        init_schema(&conn)?;

        info!(path = %path.display(), "notification store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            location: path.to_path_buf(),
        })
    }

    /// Private in-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_error("opening in-memory database"))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            location: PathBuf::from(":memory:"),
        })
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            SentinelError::StoreUnavailable("store connection mutex poisoned".to_string())
        })
    }

    /// Single-row `PENDING -> to` transition. The zero-rows check and the
    /// follow-up state lookup run inside one transaction.
    fn transition(&self, id: i64, to: NotificationState, op: &'static str) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_error(op))?;

        let changed = tx
            .execute(
                "UPDATE events SET processed = ?1 WHERE id = ?2 AND processed = ?3",
                params![to.code(), id, NotificationState::Pending.code()],
            )
            .map_err(store_error(op))?;

        if changed == 0 {
            let err = conflict_for(&tx, id, op)?;
            return Err(err);
        }

        tx.commit().map_err(store_error(op))?;
        debug!(id, state = %to, "notification state advanced");
        Ok(())
    }
}

impl EventStore for SqliteStore {
    fn insert(&self, notification: &Notification) -> Result<i64> {
        let n = notification.clone().validated()?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO events (event_time, event_type, raw_event_type, dir_path, file_path, \
             old_file_path, size, action_ref) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                to_millis(n.occurred_at),
                n.kind.as_str(),
                n.raw_kind,
                n.directory,
                n.path,
                n.old_path,
                n.size,
                n.action_ref,
            ],
        )
        .map_err(store_error("inserting notification"))?;

        let id = conn.last_insert_rowid();
        debug!(id, kind = %n.kind, path = %n.path, "notification persisted");
        Ok(id)
    }

    fn get(&self, id: i64) -> Result<StoredNotification> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                params![id],
                RawRow::from_row,
            )
            .optional()
            .map_err(store_error("reading notification"))?;

        match raw {
            Some(raw) => raw.into_stored(),
            None => Err(SentinelError::NotFound(id)),
        }
    }

    fn earliest_pending_before(&self, cutoff: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        let conn = self.lock()?;
        let min: Option<i64> = conn
            .query_row(
                "SELECT MIN(event_time) FROM events WHERE processed = ?1 AND event_time < ?2",
                params![NotificationState::Pending.code(), to_millis(cutoff)],
                |row| row.get(0),
            )
            .map_err(store_error("querying earliest pending notification"))?;

        min.map(from_millis).transpose()
    }

    fn pending_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StoredNotification>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events \
                 WHERE processed = ?1 AND event_time >= ?2 AND event_time <= ?3 \
                 ORDER BY event_time ASC, id ASC"
            ))
            .map_err(store_error("preparing pending window query"))?;

        let rows = stmt
            .query_map(
                params![
                    NotificationState::Pending.code(),
                    to_millis(from),
                    to_millis(to)
                ],
                RawRow::from_row,
            )
            .map_err(store_error("querying pending window"))?;

        let mut out = Vec::new();
        for row in rows {
            let raw = row.map_err(store_error("reading pending row"))?;
            out.push(raw.into_stored()?);
        }
        Ok(out)
    }

    fn mark_processed(&self, id: i64) -> Result<()> {
        self.transition(id, NotificationState::Processed, "marking notification processed")
    }

    fn mark_skipped(&self, id: i64) -> Result<()> {
        self.transition(id, NotificationState::Skipped, "marking notification skipped")
    }

    fn convert_delete_to_move(
        &self,
        delete_id: i64,
        create_id: i64,
        old_path: &str,
        new_path: &str,
    ) -> Result<()> {
        const OP: &str = "converting delete to move";

        let mut conn = self.lock()?;
        // Dropping `tx` without commit rolls back both statements.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_error(OP))?;

        let rewritten = tx
            .execute(
                "UPDATE events SET event_type = ?1, old_file_path = ?2, file_path = ?3 \
                 WHERE id = ?4 AND processed = ?5 AND event_type = ?6",
                params![
                    EventKind::Move.as_str(),
                    old_path,
                    new_path,
                    delete_id,
                    NotificationState::Pending.code(),
                    EventKind::Delete.as_str(),
                ],
            )
            .map_err(store_error(OP))?;
        if rewritten == 0 {
            return Err(conflict_for(&tx, delete_id, OP)?);
        }

        let skipped = tx
            .execute(
                "UPDATE events SET processed = ?1 WHERE id = ?2 AND processed = ?3",
                params![
                    NotificationState::Skipped.code(),
                    create_id,
                    NotificationState::Pending.code()
                ],
            )
            .map_err(store_error(OP))?;
        if skipped == 0 {
            return Err(conflict_for(&tx, create_id, OP)?);
        }

        tx.commit().map_err(store_error(OP))?;
        debug!(delete_id, create_id, new_path, "delete converted to move");
        Ok(())
    }

    fn state_counts(&self) -> Result<StateCounts> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT processed, COUNT(*) FROM events GROUP BY processed")
            .map_err(store_error("preparing state counts"))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))
            .map_err(store_error("counting states"))?;

        let mut counts = StateCounts::default();
        for row in rows {
            let (code, count) = row.map_err(store_error("reading state count"))?;
            let count = count.max(0) as u64;
            match NotificationState::from_code(code) {
                Some(NotificationState::Pending) => counts.pending = count,
                Some(NotificationState::Processed) => counts.processed = count,
                Some(NotificationState::Skipped) => counts.skipped = count,
                None => {
                    return Err(SentinelError::StoreUnavailable(format!(
                        "unknown processed value {code} in events table"
                    )));
                }
            }
        }
        Ok(counts)
    }
}

/// Explain why an update guarded by `processed = 0` touched nothing.
fn conflict_for(tx: &Transaction<'_>, id: i64, op: &'static str) -> Result<SentinelError> {
    let current: Option<(i64, String)> = tx
        .query_row(
            "SELECT processed, event_type FROM events WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(store_error(op))?;

    let reason = match current {
        None => "no such notification".to_string(),
        Some((code, kind)) => match NotificationState::from_code(code) {
            Some(state) if state.is_terminal() => format!("already {state}"),
            Some(_) => format!("pending but has kind {kind}"),
            None => format!("unknown state {code}"),
        },
    };
    Ok(SentinelError::Conflict { id, reason })
}

/// Column values as SQLite hands them back, converted outside the rusqlite
/// closure so enum parsing can use the crate error type.
struct RawRow {
    id: i64,
    event_time: i64,
    event_type: String,
    raw_event_type: String,
    dir_path: String,
    file_path: String,
    old_file_path: String,
    size: i64,
    action_ref: Option<String>,
    processed: i64,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            event_time: row.get(1)?,
            event_type: row.get(2)?,
            raw_event_type: row.get(3)?,
            dir_path: row.get(4)?,
            file_path: row.get(5)?,
            old_file_path: row.get(6)?,
            size: row.get(7)?,
            action_ref: row.get(8)?,
            processed: row.get(9)?,
        })
    }

    fn into_stored(self) -> Result<StoredNotification> {
        let kind: EventKind = self.event_type.parse().map_err(|e: String| {
            SentinelError::StoreUnavailable(format!("row {}: {e}", self.id))
        })?;
        let state = NotificationState::from_code(self.processed).ok_or_else(|| {
            SentinelError::StoreUnavailable(format!(
                "row {}: unknown processed value {}",
                self.id, self.processed
            ))
        })?;

        Ok(StoredNotification {
            id: self.id,
            state,
            notification: Notification {
                occurred_at: from_millis(self.event_time)?,
                kind,
                raw_kind: self.raw_event_type,
                directory: self.dir_path,
                path: self.file_path,
                old_path: self.old_file_path,
                size: self.size,
                action_ref: self.action_ref,
            },
        })
    }
}
