// src/action/resolver.rs

//! Action resolution.
//!
//! A notification's template comes from the first resolver in the chain that
//! has one, most specific first:
//! 1. the action file the notification itself references (`action_ref`),
//! 2. the action file given at process start,
//! 3. the default action.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::action::cmd_file::{ActionFileCache, ActionSet};
use crate::config::DispatchSection;
use crate::errors::Result;
use crate::store::StoredNotification;

/// Something that may know which action template applies to a notification.
pub trait ActionResolver: Send + Sync {
    /// `Ok(None)` means "not mine, ask the next resolver".
    fn resolve(&self, notification: &StoredNotification) -> Result<Option<String>>;

    /// Drop cached state that is past its TTL. Called once per dispatch tick.
    fn evict_expired(&self) {}
}

/// The notification's own action file, read through a TTL cache.
///
/// An unreadable file is logged and treated as absent so the rest of the
/// chain still gets a chance.
pub struct PerNotificationFile {
    cache: Arc<ActionFileCache>,
}

impl PerNotificationFile {
    pub fn new(cache: Arc<ActionFileCache>) -> Self {
        Self { cache }
    }
}

impl ActionResolver for PerNotificationFile {
    fn resolve(&self, notification: &StoredNotification) -> Result<Option<String>> {
        let Some(action_ref) = notification
            .notification
            .action_ref
            .as_deref()
            .filter(|r| !r.trim().is_empty())
        else {
            return Ok(None);
        };

        match self.cache.get(Path::new(action_ref)) {
            Ok(set) => Ok(set.template_for(notification.kind()).map(str::to_string)),
            Err(err) => {
                warn!(
                    id = notification.id,
                    action_file = %action_ref,
                    error = %err,
                    "ignoring unreadable per-notification action file"
                );
                Ok(None)
            }
        }
    }

    fn evict_expired(&self) {
        match self.cache.purge_expired(Instant::now()) {
            Ok(0) => {}
            Ok(evicted) => debug!(evicted, "evicted expired action files"),
            Err(err) => warn!(error = %err, "failed to evict expired action files"),
        }
    }
}

/// Action file loaded once when the process starts.
pub struct StartupActionFile {
    path: PathBuf,
    set: ActionSet,
}

impl StartupActionFile {
    /// Load `path` eagerly; a missing or malformed file is a startup error.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            set: ActionSet::load(path)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActionResolver for StartupActionFile {
    fn resolve(&self, notification: &StoredNotification) -> Result<Option<String>> {
        Ok(self
            .set
            .template_for(notification.kind())
            .map(str::to_string))
    }
}

/// A single template used for every kind.
pub struct DefaultAction {
    template: String,
}

impl DefaultAction {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl ActionResolver for DefaultAction {
    fn resolve(&self, _notification: &StoredNotification) -> Result<Option<String>> {
        Ok(Some(self.template.clone()))
    }
}

/// Ordered list of resolvers; the first concrete answer wins.
#[derive(Default)]
pub struct ActionChain {
    resolvers: Vec<Box<dyn ActionResolver>>,
}

impl ActionChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, resolver: impl ActionResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Build the standard chain from the `[dispatch]` section.
    pub fn from_config(cfg: &DispatchSection) -> Result<Self> {
        let cache = Arc::new(ActionFileCache::new(cfg.action_file_ttl()));
        let mut chain = Self::new().push(PerNotificationFile::new(cache));

        if let Some(path) = &cfg.action_file {
            chain = chain.push(StartupActionFile::load(path)?);
        }
        if let Some(template) = &cfg.default_action {
            chain = chain.push(DefaultAction::new(template.clone()));
        }
        Ok(chain)
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl ActionResolver for ActionChain {
    fn resolve(&self, notification: &StoredNotification) -> Result<Option<String>> {
        for resolver in &self.resolvers {
            if let Some(template) = resolver.resolve(notification)? {
                return Ok(Some(template));
            }
        }
        Ok(None)
    }

    fn evict_expired(&self) {
        for resolver in &self.resolvers {
            resolver.evict_expired();
        }
    }
}
