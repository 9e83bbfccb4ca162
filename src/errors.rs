// src/errors.rs

//! Crate-wide error taxonomy and helpers.

use thiserror::Error;

use crate::types::EventKind;

#[derive(Error, Debug)]
pub enum SentinelError {
    /// Malformed or incomplete notification; never enters the store.
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// The SQLite store could not be opened, read or written.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Notification {0} not found")]
    NotFound(i64),

    /// A state transition affected zero rows.
    #[error("Conflict on notification {id}: {reason}")]
    Conflict { id: i64, reason: String },

    #[error("No action configured for notification {id} ({kind})")]
    ActionUnresolved { id: i64, kind: EventKind },

    #[error("Action for notification {id} failed: {reason}")]
    ActionFailed { id: i64, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SentinelError {
    /// Errors that leave the notification pending for the next tick without
    /// indicating anything is wrong with the store itself.
    pub fn is_per_notification(&self) -> bool {
        matches!(
            self,
            SentinelError::Conflict { .. }
                | SentinelError::ActionUnresolved { .. }
                | SentinelError::ActionFailed { .. }
        )
    }
}

/// Build a `map_err` adapter that wraps a SQLite error with the operation it
/// interrupted.
pub fn store_error(context: &'static str) -> impl Fn(rusqlite::Error) -> SentinelError {
    move |err| SentinelError::StoreUnavailable(format!("{context}: {err}"))
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SentinelError>;
