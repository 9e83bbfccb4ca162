// src/coalesce/window.rs

//! Window Selector.
//!
//! Only rows older than `now - 2W` are eligible, so a row is never evaluated
//! before its partner could plausibly have been written. From the earliest
//! eligible row `tmin`, every pending row in `[tmin, tmin + 2W]` is returned:
//! the first `W` supplies dispatch candidates, the second `W` only supplies
//! merge partners.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::trace;

use crate::errors::Result;
use crate::store::{EventStore, StoredNotification};

/// A time-ordered slice of pending notifications for one coalescing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// `occurred_at` of the earliest eligible pending row.
    pub earliest: DateTime<Utc>,
    /// Pending rows in `[earliest, earliest + 2W]`, ordered by
    /// `(occurred_at, id)`.
    pub entries: Vec<StoredNotification>,
}

impl Window {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WindowSelector {
    window: TimeDelta,
}

impl WindowSelector {
    pub fn new(window: TimeDelta) -> Self {
        Self { window }
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    /// Select the next window as of `now`. `None` means nothing is eligible
    /// yet and the cycle is a no-op.
    pub fn select<S>(&self, store: &S, now: DateTime<Utc>) -> Result<Option<Window>>
    where
        S: EventStore + ?Sized,
    {
        let span = self.window * 2;
        let cutoff = now - span;

        let Some(earliest) = store.earliest_pending_before(cutoff)? else {
            trace!(%cutoff, "no pending notifications old enough to evaluate");
            return Ok(None);
        };

        let entries = store.pending_between(earliest, earliest + span)?;
        trace!(%earliest, rows = entries.len(), "selected pending window");
        Ok(Some(Window { earliest, entries }))
    }
}
