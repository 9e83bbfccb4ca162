#![allow(dead_code)]

use std::path::PathBuf;

use backup_sentinel::config::{ConfigFile, RawConfigFile};
use backup_sentinel::store::{EventStore, Notification};
use backup_sentinel::types::EventKind;
use chrono::{DateTime, TimeDelta, Utc};

/// Fixed reference instant for tests: 2025-11-03T08:43:40Z.
pub fn base_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_762_159_420, 0).expect("valid base time")
}

/// `base_time() + ms`.
pub fn at_ms(ms: i64) -> DateTime<Utc> {
    base_time() + TimeDelta::milliseconds(ms)
}

/// Builder for `Notification` to simplify test setup.
#[derive(Debug, Clone)]
pub struct NotificationBuilder {
    notification: Notification,
}

impl NotificationBuilder {
    pub fn new(kind: EventKind, path: &str) -> Self {
        Self {
            notification: Notification::new(base_time(), kind, path),
        }
    }

    pub fn create(path: &str) -> Self {
        Self::new(EventKind::Create, path)
    }

    pub fn modify(path: &str) -> Self {
        Self::new(EventKind::Modify, path)
    }

    pub fn rename(path: &str) -> Self {
        Self::new(EventKind::Rename, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(EventKind::Delete, path)
    }

    /// Offset from `base_time()` in milliseconds.
    pub fn at_ms(mut self, ms: i64) -> Self {
        self.notification.occurred_at = at_ms(ms);
        self
    }

    pub fn at(mut self, ts: DateTime<Utc>) -> Self {
        self.notification.occurred_at = ts;
        self
    }

    pub fn size(mut self, size: i64) -> Self {
        self.notification.size = size;
        self
    }

    pub fn old_path(mut self, old_path: &str) -> Self {
        self.notification.old_path = old_path.to_string();
        self
    }

    pub fn raw_kind(mut self, raw_kind: &str) -> Self {
        self.notification.raw_kind = raw_kind.to_string();
        self
    }

    pub fn directory(mut self, directory: &str) -> Self {
        self.notification.directory = directory.to_string();
        self
    }

    pub fn action_ref(mut self, action_ref: &str) -> Self {
        self.notification.action_ref = Some(action_ref.to_string());
        self
    }

    pub fn build(self) -> Notification {
        self.notification
    }

    /// Insert into `store`, returning the new id.
    pub fn insert_into<S: EventStore + ?Sized>(self, store: &S) -> i64 {
        store
            .insert(&self.notification)
            .expect("inserting test notification")
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store.path = path.into();
        self
    }

    pub fn window_ms(mut self, window_ms: u64) -> Self {
        self.config.coalesce.window_ms = window_ms;
        self
    }

    pub fn suppress_modify_after(mut self, kinds: &[EventKind]) -> Self {
        self.config.coalesce.suppress_modify_after = kinds.to_vec();
        self
    }

    pub fn tick_ms(mut self, tick_ms: u64) -> Self {
        self.config.dispatch.tick_ms = tick_ms;
        self
    }

    pub fn default_action(mut self, template: &str) -> Self {
        self.config.dispatch.default_action = Some(template.to_string());
        self
    }

    pub fn action_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dispatch.action_file = Some(path.into());
        self
    }

    pub fn skip_patterns(mut self, patterns: &[&str]) -> Self {
        self.config.ingest.skip_patterns = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn raw(&self) -> &RawConfigFile {
        &self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
