// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;
use serde::Deserialize;

use crate::types::EventKind;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [store]
/// path = "./backupSentinel.db"
///
/// [coalesce]
/// window_ms = 2000
/// suppress_modify_after = ["RENAME"]
///
/// [dispatch]
/// tick_ms = 1000
/// default_action = "rsync -a %fullfile% /backup/"
/// action_file = "./actions.json"
///
/// [ingest]
/// skip_patterns = ["**/.DS_Store"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub coalesce: CoalesceSection,

    #[serde(default)]
    pub dispatch: DispatchSection,

    #[serde(default)]
    pub ingest: IngestSection,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on the invariants checked there.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub store: StoreSection,
    pub coalesce: CoalesceSection,
    pub dispatch: DispatchSection,
    pub ingest: IngestSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            store: raw.store,
            coalesce: raw.coalesce,
            dispatch: raw.dispatch,
            ingest: raw.ingest,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

/// `[store]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// How long a writer waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./backupSentinel.db")
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StoreSection {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// `[coalesce]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CoalesceSection {
    /// The coalescing window `W`. Selection looks `2W` ahead; only the first
    /// `W` of a selection is dispatched per tick.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Kinds whose same-path `MODIFY` follower (within `W`) is suppressed.
    #[serde(default = "default_suppress_modify_after")]
    pub suppress_modify_after: Vec<EventKind>,
}

fn default_window_ms() -> u64 {
    2_000
}

fn default_suppress_modify_after() -> Vec<EventKind> {
    vec![EventKind::Rename]
}

impl Default for CoalesceSection {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            suppress_modify_after: default_suppress_modify_after(),
        }
    }
}

impl CoalesceSection {
    pub fn window(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.window_ms as i64)
    }
}

/// `[dispatch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchSection {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Action template used when nothing more specific resolves.
    #[serde(default)]
    pub default_action: Option<String>,

    /// Action file loaded once at startup.
    #[serde(default)]
    pub action_file: Option<PathBuf>,

    /// How long a parsed per-notification action file stays cached.
    #[serde(default = "default_action_file_ttl_secs")]
    pub action_file_ttl_secs: u64,

    /// Upper bound on a single action's run time. `None` waits indefinitely.
    #[serde(default)]
    pub action_timeout_ms: Option<u64>,
}

fn default_tick_ms() -> u64 {
    1_000
}

fn default_action_file_ttl_secs() -> u64 {
    300
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            default_action: None,
            action_file: None,
            action_file_ttl_secs: default_action_file_ttl_secs(),
            action_timeout_ms: None,
        }
    }
}

impl DispatchSection {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn action_file_ttl(&self) -> Duration {
        Duration::from_secs(self.action_file_ttl_secs)
    }

    pub fn action_timeout(&self) -> Option<Duration> {
        self.action_timeout_ms.map(Duration::from_millis)
    }
}

/// `[ingest]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestSection {
    /// Globs matched against `/`-normalised paths; matches are dropped before
    /// they reach the store.
    #[serde(default = "default_skip_patterns")]
    pub skip_patterns: Vec<String>,
}

fn default_skip_patterns() -> Vec<String> {
    [
        "**/@eaDir",
        "**/@eaDir/**",
        "**/*@SynoEAStream*",
        "**/._*",
        "**/.DS_Store",
        "**/Thumbs.db",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            skip_patterns: default_skip_patterns(),
        }
    }
}
