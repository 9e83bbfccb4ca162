// src/dispatch/dispatcher.rs

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::action::{render, ActionChain, ActionResolver, ActionRunner};
use crate::coalesce::BatchPlanner;
use crate::config::ConfigFile;
use crate::errors::{Result, SentinelError};
use crate::store::{EventStore, StoredNotification};

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub candidates: usize,
    /// Actions that succeeded and were marked processed.
    pub dispatched: usize,
    /// Actions that failed, or whose row was no longer pending; left pending.
    pub failed: usize,
    /// Candidates with no resolvable action; left pending.
    pub unresolved: usize,
    pub merged: usize,
    pub suppressed: usize,
    pub deferred: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.candidates == 0 && self.merged == 0 && self.suppressed == 0 && self.deferred == 0
    }
}

/// Periodic driver: select, coalesce, run one action per candidate, mark it
/// processed on success.
///
/// Candidates are handled serially in window order. Per-notification failures
/// are logged and leave the row pending; the next tick retries them.
pub struct Dispatcher<S, R>
where
    S: EventStore,
    R: ActionRunner,
{
    store: Arc<S>,
    planner: BatchPlanner,
    actions: ActionChain,
    runner: R,
    tick: Duration,
}

impl<S: EventStore, R: ActionRunner> fmt::Debug for Dispatcher<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("planner", &self.planner)
            .field("resolvers", &self.actions.len())
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl<S, R> Dispatcher<S, R>
where
    S: EventStore,
    R: ActionRunner,
{
    pub fn new(
        store: Arc<S>,
        planner: BatchPlanner,
        actions: ActionChain,
        runner: R,
        tick: Duration,
    ) -> Self {
        Self {
            store,
            planner,
            actions,
            runner,
            tick,
        }
    }

    /// Build a dispatcher from validated configuration. Loads the startup
    /// action file, if any.
    pub fn from_config(store: Arc<S>, cfg: &ConfigFile, runner: R) -> Result<Self> {
        let actions = ActionChain::from_config(&cfg.dispatch)?;
        if actions.len() == 1 {
            // Only the per-notification tier: rows without an action_ref stay pending.
            warn!("no default action or action file configured");
        }
        Ok(Self::new(
            store,
            BatchPlanner::from_config(&cfg.coalesce),
            actions,
            runner,
            cfg.dispatch.tick(),
        ))
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Tick until `shutdown` resolves. A tick in progress always finishes
    /// before the loop observes shutdown.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            tick_ms = self.tick.as_millis() as u64,
            window_ms = self.planner.window().num_milliseconds(),
            "dispatch loop started"
        );

        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested; stopping dispatch loop");
                    break;
                }
                _ = ticker.tick() => {
                    // A failed tick (store unavailable) is retried on the next one.
                    if let Err(err) = self.run_tick().await {
                        error!(error = %err, "dispatch tick failed");
                    }
                }
            }
        }

        info!("dispatch loop exiting");
        Ok(())
    }

    pub async fn run_tick(&self) -> Result<TickReport> {
        self.run_tick_at(Utc::now()).await
    }

    /// One full cycle evaluated as of `now`.
    pub async fn run_tick_at(&self, now: DateTime<Utc>) -> Result<TickReport> {
        self.actions.evict_expired();
        let batch = self.planner.next_batch(self.store.as_ref(), now)?;

        let mut report = TickReport {
            candidates: batch.candidates.len(),
            merged: batch.merged,
            suppressed: batch.suppressed,
            deferred: batch.deferred,
            ..TickReport::default()
        };

        for candidate in &batch.candidates {
            match self.dispatch_one(candidate).await {
                Ok(()) => report.dispatched += 1,
                Err(err @ SentinelError::ActionUnresolved { .. }) => {
                    warn!(id = candidate.id, error = %err, "leaving notification pending");
                    report.unresolved += 1;
                }
                Err(err) if err.is_per_notification() => {
                    error!(
                        id = candidate.id,
                        kind = %candidate.kind(),
                        path = %candidate.path(),
                        error = %err,
                        "dispatch failed; leaving notification pending"
                    );
                    report.failed += 1;
                }
                // The store itself is failing; the rest of the batch waits
                // for the next tick.
                Err(err) => {
                    error!(
                        id = candidate.id,
                        dispatched = report.dispatched,
                        error = %err,
                        "aborting dispatch tick"
                    );
                    return Err(err);
                }
            }
        }

        if !report.is_idle() {
            info!(
                candidates = report.candidates,
                dispatched = report.dispatched,
                failed = report.failed,
                unresolved = report.unresolved,
                merged = report.merged,
                suppressed = report.suppressed,
                deferred = report.deferred,
                "dispatch tick complete"
            );
        }
        Ok(report)
    }

    async fn dispatch_one(&self, notification: &StoredNotification) -> Result<()> {
        let id = notification.id;
        let template =
            self.actions
                .resolve(notification)?
                .ok_or(SentinelError::ActionUnresolved {
                    id,
                    kind: notification.kind(),
                })?;

        let command = render(&template, notification);
        debug!(id, kind = %notification.kind(), path = %notification.path(), "dispatching");

        let output = self.runner.run(id, &command).await?;
        if !output.success() {
            let stderr = output.stderr.trim();
            let reason = if stderr.is_empty() {
                format!("exit code {}", output.exit_code)
            } else {
                format!("exit code {}: {stderr}", output.exit_code)
            };
            return Err(SentinelError::ActionFailed { id, reason });
        }

        self.store.mark_processed(id)?;
        debug!(id, "marked processed");
        Ok(())
    }
}
