// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SentinelError};
use crate::ingest::SkipFilter;
use crate::types::EventKind;

/// Largest accepted coalescing window (one day).
pub const MAX_WINDOW_MS: u64 = 86_400_000;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::SentinelError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_store(cfg)?;
    validate_coalesce(cfg)?;
    validate_dispatch(cfg)?;
    validate_ingest(cfg)?;
    Ok(())
}

fn validate_store(cfg: &RawConfigFile) -> Result<()> {
    if cfg.store.path.as_os_str().is_empty() {
        return Err(SentinelError::ConfigError(
            "[store].path must not be empty".to_string(),
        ));
    }
    if cfg.store.busy_timeout_ms > u64::from(u32::MAX) {
        return Err(SentinelError::ConfigError(format!(
            "[store].busy_timeout_ms is too large (got {})",
            cfg.store.busy_timeout_ms
        )));
    }
    Ok(())
}

fn validate_coalesce(cfg: &RawConfigFile) -> Result<()> {
    let window_ms = cfg.coalesce.window_ms;
    if window_ms == 0 || window_ms > MAX_WINDOW_MS {
        return Err(SentinelError::ConfigError(format!(
            "[coalesce].window_ms must be between 1 and {MAX_WINDOW_MS} (got {window_ms})"
        )));
    }

    for kind in cfg.coalesce.suppress_modify_after.iter() {
        if !matches!(kind, EventKind::Rename | EventKind::Move | EventKind::Create) {
            return Err(SentinelError::ConfigError(format!(
                "[coalesce].suppress_modify_after only accepts RENAME, MOVE or CREATE (got {kind})"
            )));
        }
    }
    Ok(())
}

fn validate_dispatch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.dispatch.tick_ms == 0 {
        return Err(SentinelError::ConfigError(
            "[dispatch].tick_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.dispatch.action_timeout_ms == Some(0) {
        return Err(SentinelError::ConfigError(
            "[dispatch].action_timeout_ms must be >= 1 when set".to_string(),
        ));
    }
    if let Some(action) = &cfg.dispatch.default_action {
        if action.trim().is_empty() {
            return Err(SentinelError::ConfigError(
                "[dispatch].default_action must not be blank".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_ingest(cfg: &RawConfigFile) -> Result<()> {
    // Compiling here surfaces bad globs at startup instead of on first event.
    SkipFilter::new(&cfg.ingest.skip_patterns)?;
    Ok(())
}
