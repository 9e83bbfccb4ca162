// src/ingest/watcher.rs

//! Native directory watcher (`--watch DIR`).
//!
//! Stands in for the external watcher tool: notify events are mapped onto
//! canonical notifications and ingested like producer payloads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Config, Event, EventKind as NotifyKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ingest::{ingest, IngestOutcome, SkipFilter};
use crate::store::{EventStore, Notification};
use crate::types::EventKind;

/// Keeps the underlying `RecommendedWatcher` alive. Dropping it stops
/// watching, which in turn ends the ingest task.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    root: PathBuf,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl WatcherHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Watch `root` recursively and ingest every mapped notification into
/// `store`.
pub fn spawn_watcher<S>(
    root: impl Into<PathBuf>,
    store: Arc<S>,
    filter: SkipFilter,
) -> Result<(WatcherHandle, JoinHandle<()>)>
where
    S: EventStore + 'static,
{
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("backup-sentinel: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("backup-sentinel: file watch error: {err}");
            }
        },
        Config::default(),
    )
    .context("creating directory watcher")?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {}", root.display()))?;

    info!(root = %root.display(), "directory watcher started");

    let task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");
            for notification in notifications_from_event(&event, Utc::now()) {
                match ingest(store.as_ref(), notification, &filter) {
                    Ok(IngestOutcome::Stored(id)) => debug!(id, "queued notification"),
                    Ok(IngestOutcome::Skipped) => {}
                    Err(err) => warn!(error = %err, "failed to queue notification"),
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok((
        WatcherHandle {
            _inner: watcher,
            root,
        },
        task,
    ))
}

/// Map one notify event onto zero or more canonical notifications.
///
/// Metadata and access events, and anything notify cannot classify, map to
/// nothing. `size` is always 0: the delete half of a move arrives after the
/// file has left its old path, so only "unknown" compares equal across both
/// halves.
pub fn notifications_from_event(event: &Event, received_at: DateTime<Utc>) -> Vec<Notification> {
    let raw_kind = format!("{:?}", event.kind);
    let make = |kind: EventKind, path: &Path| {
        let mut n = Notification::new(received_at, kind, path_string(path));
        n.raw_kind = raw_kind.clone();
        n
    };

    match event.kind {
        NotifyKind::Create(CreateKind::Folder) => Vec::new(),
        NotifyKind::Create(_) => event.paths.iter().map(|p| make(EventKind::Create, p)).collect(),
        NotifyKind::Modify(ModifyKind::Data(_)) | NotifyKind::Modify(ModifyKind::Any) => event
            .paths
            .iter()
            .map(|p| make(EventKind::Modify, p))
            .collect(),
        NotifyKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to] => {
                let mut n = make(EventKind::Rename, to);
                n.old_path = path_string(from);
                vec![n]
            }
            _ => Vec::new(),
        },
        NotifyKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .iter()
            .map(|p| make(EventKind::Delete, p))
            .collect(),
        NotifyKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .iter()
            .map(|p| make(EventKind::Create, p))
            .collect(),
        // Backends that cannot pair rename halves: infer the side from
        // whether the path still exists.
        NotifyKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                let kind = if p.exists() {
                    EventKind::Create
                } else {
                    EventKind::Delete
                };
                make(kind, p)
            })
            .collect(),
        NotifyKind::Remove(RemoveKind::Folder) => Vec::new(),
        NotifyKind::Remove(_) => event.paths.iter().map(|p| make(EventKind::Delete, p)).collect(),
        _ => Vec::new(),
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
