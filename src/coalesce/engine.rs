// src/coalesce/engine.rs

//! Coalescing Engine.
//!
//! A single left-to-right scan over a [`Window`]. Positions consumed by an
//! earlier merge are tracked in a `Vec<bool>` indexed like `entries`, so the
//! slice itself is never mutated while being scanned.
//!
//! Rules, first match wins:
//! - DELETE followed within `W` by a CREATE of equal size and basename: the
//!   pair becomes one MOVE (persisted atomically) and the CREATE is consumed.
//! - RENAME (or another configured kind) followed within `W` by a MODIFY of
//!   the same path: the MODIFY is skipped and consumed.
//! - Anything else is emitted unchanged.
//!
//! Partners are the nearest qualifying row scanning forward, not the best fit.

use chrono::TimeDelta;
use tracing::{debug, warn};

use crate::coalesce::window::Window;
use crate::store::{EventStore, StoredNotification};
use crate::types::EventKind;

/// Result of one coalescing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoalescedBatch {
    /// Notifications to dispatch, in `(occurred_at, id)` order. Merged rows
    /// carry their post-merge shape.
    pub candidates: Vec<StoredNotification>,
    /// DELETE/CREATE pairs turned into a MOVE.
    pub merged: usize,
    /// MODIFY rows marked skipped.
    pub suppressed: usize,
    /// Rows left pending because a merge could not be persisted.
    pub deferred: usize,
}

impl CoalescedBatch {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Coalescer {
    window: TimeDelta,
    suppress_modify_after: Vec<EventKind>,
}

impl Coalescer {
    pub fn new(window: TimeDelta, suppress_modify_after: Vec<EventKind>) -> Self {
        Self {
            window,
            suppress_modify_after,
        }
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    fn suppresses_modify(&self, kind: EventKind) -> bool {
        self.suppress_modify_after.contains(&kind)
    }

    /// Scan `window`, writing merges and suppressions back through `store`.
    ///
    /// Store failures during a merge are logged and never abort the pass.
    pub fn coalesce<S>(&self, store: &S, window: &Window) -> CoalescedBatch
    where
        S: EventStore + ?Sized,
    {
        let entries = &window.entries;
        let mut consumed = vec![false; entries.len()];
        let mut batch = CoalescedBatch::default();

        for i in 0..entries.len() {
            if consumed[i] {
                continue;
            }
            let current = &entries[i];
            if current.occurred_at() - window.earliest > self.window {
                // The rest of the slice only exists to supply partners.
                break;
            }

            if current.kind() == EventKind::Delete {
                let partner = self.find_partner(entries, &consumed, i, |base, other| {
                    other.kind() == EventKind::Create
                        && other.notification.size == base.notification.size
                        && other.notification.basename() == base.notification.basename()
                });
                if let Some(j) = partner {
                    consumed[j] = true;
                    let create = &entries[j];
                    match store.convert_delete_to_move(
                        current.id,
                        create.id,
                        current.path(),
                        create.path(),
                    ) {
                        Ok(()) => {
                            debug!(
                                delete_id = current.id,
                                create_id = create.id,
                                from = %current.path(),
                                to = %create.path(),
                                "merged delete and create into move"
                            );
                            batch.merged += 1;
                            batch
                                .candidates
                                .push(current.clone().into_move(create.path().to_string()));
                        }
                        Err(err) => {
                            // Both rows remain pending and are re-evaluated next tick.
                            warn!(
                                delete_id = current.id,
                                create_id = create.id,
                                error = %err,
                                "delete->move conversion failed; deferring pair"
                            );
                            batch.deferred += 2;
                        }
                    }
                    continue;
                }
            }

            if self.suppresses_modify(current.kind()) {
                let partner = self.find_partner(entries, &consumed, i, |base, other| {
                    other.kind() == EventKind::Modify && other.path() == base.path()
                });
                if let Some(j) = partner {
                    consumed[j] = true;
                    let modify = &entries[j];
                    match store.mark_skipped(modify.id) {
                        Ok(()) => {
                            debug!(
                                id = current.id,
                                skipped_id = modify.id,
                                kind = %current.kind(),
                                path = %current.path(),
                                "suppressed trailing modify"
                            );
                            batch.suppressed += 1;
                        }
                        Err(err) => {
                            warn!(
                                id = current.id,
                                skipped_id = modify.id,
                                error = %err,
                                "failed to mark trailing modify skipped"
                            );
                        }
                    }
                    batch.candidates.push(current.clone());
                    continue;
                }
            }

            batch.candidates.push(current.clone());
        }

        batch
    }

    /// Nearest unconsumed row after `start` within `W` of it that satisfies
    /// `matches(base, candidate)`.
    fn find_partner<F>(
        &self,
        entries: &[StoredNotification],
        consumed: &[bool],
        start: usize,
        matches: F,
    ) -> Option<usize>
    where
        F: Fn(&StoredNotification, &StoredNotification) -> bool,
    {
        let base = &entries[start];
        for (j, other) in entries.iter().enumerate().skip(start + 1) {
            if other.occurred_at() - base.occurred_at() > self.window {
                break;
            }
            if consumed[j] {
                continue;
            }
            if matches(base, other) {
                return Some(j);
            }
        }
        None
    }
}
