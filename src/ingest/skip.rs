// src/ingest/skip.rs

use std::fmt;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::{Result, SentinelError};
use crate::store::Notification;

/// Compiled skip globs from `[ingest].skip_patterns`.
///
/// Paths are normalised to `/` separators before matching, so the same
/// patterns cover POSIX paths and `\\host\share\...` paths from Windows
/// watchers.
#[derive(Clone)]
pub struct SkipFilter {
    patterns: Vec<String>,
    set: GlobSet,
}

impl fmt::Debug for SkipFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipFilter")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl SkipFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                SentinelError::ConfigError(format!("invalid skip pattern '{pattern}': {e}"))
            })?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| SentinelError::ConfigError(format!("building skip patterns: {e}")))?;

        Ok(Self {
            patterns: patterns.to_vec(),
            set,
        })
    }

    /// A filter that never skips.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    pub fn is_match(&self, path: &str) -> bool {
        !path.is_empty() && self.set.is_match(normalise(path))
    }

    /// True if either the path or the old path of `notification` matches.
    pub fn should_skip(&self, notification: &Notification) -> bool {
        self.is_match(&notification.path) || self.is_match(&notification.old_path)
    }
}

fn normalise(path: &str) -> String {
    path.replace('\\', "/")
}
