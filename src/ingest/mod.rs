// src/ingest/mod.rs

//! Producer path: getting notifications into the store.
//!
//! - `payload.rs`: repairing and parsing the external watcher's payload.
//! - `skip.rs`: glob filter for files that are never worth backing up.
//! - `watcher.rs`: native `notify` watcher for `--watch`.

use tracing::debug;

use crate::errors::{Result, SentinelError};
use crate::store::{EventStore, Notification};

pub mod payload;
pub mod skip;
pub mod watcher;

pub use payload::{map_raw_kind, parse_payload, repair_raw_payload};
pub use skip::SkipFilter;
pub use watcher::{notifications_from_event, spawn_watcher, WatcherHandle};

/// What happened to one accepted notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Stored(i64),
    /// Matched a skip pattern; nothing was written.
    Skipped,
}

/// Filter, validate and append one notification.
pub fn ingest<S>(store: &S, notification: Notification, filter: &SkipFilter) -> Result<IngestOutcome>
where
    S: EventStore + ?Sized,
{
    if filter.should_skip(&notification) {
        debug!(path = %notification.path, "path matches a skip pattern; dropping");
        return Ok(IngestOutcome::Skipped);
    }

    // `insert` validates too; validating here keeps the logged fields canonical.
    let notification = notification.validated()?;
    let id = store.insert(&notification)?;
    debug!(
        id,
        kind = %notification.kind,
        path = %notification.path,
        occurred_at = %notification.occurred_at,
        "persisted notification"
    );
    Ok(IngestOutcome::Stored(id))
}

/// Producer mode: repair the argument vector, parse it and ingest it.
pub fn ingest_payload<S, A>(store: &S, args: &[A], filter: &SkipFilter) -> Result<IngestOutcome>
where
    S: EventStore + ?Sized,
    A: AsRef<str>,
{
    if args.is_empty() {
        return Err(SentinelError::Integrity(
            "missing watcher payload".to_string(),
        ));
    }
    let raw = repair_raw_payload(args);
    debug!(payload = %raw, "repaired watcher payload");
    let notification = parse_payload(&raw)?;
    ingest(store, notification, filter)
}
