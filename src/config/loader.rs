// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SentinelError};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "sentinel.toml";

/// Load a configuration file and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for the
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Resolve the effective configuration for a CLI invocation.
///
/// - An explicit `--config` must exist.
/// - Otherwise `sentinel.toml` is used when present, built-in defaults when not.
/// - `--db`, `--cmd` and `--cmd-file` override the file, and the result is
///   validated again.
pub fn load_for_cli(args: &CliArgs) -> Result<ConfigFile> {
    let mut raw = match &args.config {
        Some(path) => {
            if !path.is_file() {
                return Err(SentinelError::ConfigError(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            load_from_path(path)?
        }
        None => {
            let fallback = default_config_path();
            if fallback.is_file() {
                debug!(path = %fallback.display(), "using config from working directory");
                load_from_path(&fallback)?
            } else {
                RawConfigFile::default()
            }
        }
    };

    apply_cli_overrides(&mut raw, args);
    ConfigFile::try_from(raw)
}

fn apply_cli_overrides(raw: &mut RawConfigFile, args: &CliArgs) {
    if let Some(db) = &args.db {
        raw.store.path = db.clone();
    }
    if let Some(cmd) = &args.cmd {
        raw.dispatch.default_action = Some(cmd.clone());
    }
    if let Some(cmd_file) = &args.cmd_file {
        raw.dispatch.action_file = Some(cmd_file.clone());
    }
}
