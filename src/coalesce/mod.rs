// src/coalesce/mod.rs

//! Window selection and coalescing.
//!
//! [`BatchPlanner`] glues the two stages together so the dispatch loop asks
//! for one thing per tick: the candidates to run now.

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::CoalesceSection;
use crate::errors::Result;
use crate::store::EventStore;
use crate::types::EventKind;

pub mod engine;
pub mod window;

pub use engine::{CoalescedBatch, Coalescer};
pub use window::{Window, WindowSelector};

#[derive(Debug, Clone)]
pub struct BatchPlanner {
    selector: WindowSelector,
    coalescer: Coalescer,
}

impl BatchPlanner {
    pub fn new(window: TimeDelta, suppress_modify_after: Vec<EventKind>) -> Self {
        Self {
            selector: WindowSelector::new(window),
            coalescer: Coalescer::new(window, suppress_modify_after),
        }
    }

    pub fn from_config(cfg: &CoalesceSection) -> Self {
        Self::new(cfg.window(), cfg.suppress_modify_after.clone())
    }

    pub fn window(&self) -> TimeDelta {
        self.selector.window()
    }

    /// Select and coalesce the next window as of `now`. An empty batch means
    /// nothing is eligible yet.
    pub fn next_batch<S>(&self, store: &S, now: DateTime<Utc>) -> Result<CoalescedBatch>
    where
        S: EventStore + ?Sized,
    {
        match self.selector.select(store, now)? {
            Some(window) => Ok(self.coalescer.coalesce(store, &window)),
            None => Ok(CoalescedBatch::default()),
        }
    }
}
