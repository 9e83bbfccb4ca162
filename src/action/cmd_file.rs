// src/action/cmd_file.rs

//! JSON action files and their TTL cache.
//!
//! ```json
//! {
//!   "add_cmd": "rsync -a %fullfile% /backup/",
//!   "modify_cmd": "rsync -a %fullfile% /backup/",
//!   "move_cmd": "/opt/bin/mirror-move %oldfullfile% %fullfile%"
//! }
//! ```
//!
//! Every key is optional; empty strings count as absent.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

use crate::errors::{Result, SentinelError};
use crate::types::EventKind;

#[derive(Debug, Default, Deserialize)]
struct RawActionFile {
    #[serde(default)]
    add_cmd: Option<String>,
    #[serde(default)]
    modify_cmd: Option<String>,
    #[serde(default)]
    rename_cmd: Option<String>,
    #[serde(default)]
    move_cmd: Option<String>,
    #[serde(default)]
    delete_cmd: Option<String>,
}

/// Per-kind action templates from one action file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSet {
    templates: HashMap<EventKind, String>,
}

impl ActionSet {
    /// Parse the JSON text of an action file.
    pub fn parse(json: &str) -> Result<Self> {
        let raw: RawActionFile = serde_json::from_str(json)?;

        let mut templates = HashMap::new();
        for (kind, value) in [
            (EventKind::Create, raw.add_cmd),
            (EventKind::Modify, raw.modify_cmd),
            (EventKind::Rename, raw.rename_cmd),
            (EventKind::Move, raw.move_cmd),
            (EventKind::Delete, raw.delete_cmd),
        ] {
            if let Some(template) = value.filter(|t| !t.trim().is_empty()) {
                templates.insert(kind, template);
            }
        }
        Ok(Self { templates })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            SentinelError::ConfigError(format!(
                "reading action file {}: {e}",
                path.display()
            ))
        })?;
        Self::parse(&contents).map_err(|e| {
            SentinelError::ConfigError(format!(
                "parsing action file {}: {e}",
                path.display()
            ))
        })
    }

    pub fn template_for(&self, kind: EventKind) -> Option<&str> {
        self.templates.get(&kind).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[derive(Debug)]
struct CachedActionSet {
    set: Arc<ActionSet>,
    expires_at: Instant,
}

/// Parsed action files keyed by path, each valid for `ttl` after it was read.
///
/// Edits to an action file are picked up once its entry expires.
#[derive(Debug)]
pub struct ActionFileCache {
    ttl: Duration,
    entries: Mutex<HashMap<PathBuf, CachedActionSet>>,
}

impl ActionFileCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, path: &Path) -> Result<Arc<ActionSet>> {
        self.get_at(path, Instant::now())
    }

    /// Like [`get`](Self::get) with an explicit clock.
    pub fn get_at(&self, path: &Path, now: Instant) -> Result<Arc<ActionSet>> {
        if let Some(entry) = self.lock()?.get(path) {
            if now < entry.expires_at {
                return Ok(Arc::clone(&entry.set));
            }
        }

        // Read outside the lock; a concurrent reload of the same file is harmless.
        debug!(path = %path.display(), "loading action file");
        let set = Arc::new(ActionSet::load(path)?);
        self.lock()?.insert(
            path.to_path_buf(),
            CachedActionSet {
                set: Arc::clone(&set),
                expires_at: now + self.ttl,
            },
        );
        Ok(set)
    }

    /// Drop entries that expired before `now`. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> Result<usize> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        Ok(before - entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<PathBuf, CachedActionSet>>> {
        self.entries
            .lock()
            .map_err(|_| SentinelError::Other(anyhow::anyhow!("action file cache lock poisoned")))
    }
}
