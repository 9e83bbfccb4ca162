// src/ingest/payload.rs

//! Raw watcher payload handling.
//!
//! The upstream watcher is configured to pass one JSON object split across
//! process arguments, for example:
//!
//! ```text
//! {"t":"2025/11/3 16:43:40", "e":"删除", "d":"\\192.168.1.2\a\b", "f":"\\192.168.1.2\a\b\1.jpg", "of":""}
//! ```
//!
//! Its variables are inserted without escaping, so backslashes in Windows
//! paths must be doubled before the text is valid JSON, and an empty quoted
//! variable arrives as `"""`.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::errors::{Result, SentinelError};
use crate::store::Notification;
use crate::types::EventKind;

/// `strftime` layout of the `t` field, in local time. Day and month may be
/// unpadded.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(rename = "t", default)]
    timestamp: String,
    #[serde(rename = "e", default)]
    kind: String,
    #[serde(rename = "d", default)]
    directory: String,
    #[serde(rename = "f", default)]
    path: String,
    #[serde(rename = "of", default)]
    old_path: String,
    #[serde(default)]
    cmd_file: String,
    #[serde(rename = "s", default)]
    size: Option<SizeField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeField {
    Number(i64),
    Text(String),
}

impl SizeField {
    fn bytes(&self) -> i64 {
        match self {
            SizeField::Number(n) => *n,
            SizeField::Text(s) => s.trim().parse().unwrap_or_else(|_| {
                debug!(size = %s, "unparsable size; using 0");
                0
            }),
        }
    }
}

/// Join the argument vector and undo the upstream tool's quoting quirks.
pub fn repair_raw_payload<S: AsRef<str>>(args: &[S]) -> String {
    let joined = args
        .iter()
        .map(|a| a.as_ref())
        .collect::<Vec<_>>()
        .join(" ");
    let mut repaired = joined.replace('\\', r"\\");
    if repaired.contains(r#"""""#) && !repaired.contains(r#""""""#) {
        repaired = repaired.replace(r#"""""#, r#""""#);
    }
    repaired
}

/// Map an upstream kind token to the canonical kind. Accepts the watcher's
/// Chinese vocabulary and the canonical English names in any case.
pub fn map_raw_kind(raw: &str) -> Option<EventKind> {
    match raw.trim() {
        "新增" | "创建" => Some(EventKind::Create),
        "修改" => Some(EventKind::Modify),
        "重命名" => Some(EventKind::Rename),
        "删除" => Some(EventKind::Delete),
        other => other.parse().ok(),
    }
}

/// Parse a repaired payload into a notification. Structural completeness is
/// checked later, on insertion.
pub fn parse_payload(raw: &str) -> Result<Notification> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SentinelError::Integrity("empty watcher payload".to_string()));
    }

    let payload: RawPayload = serde_json::from_str(trimmed)
        .map_err(|e| SentinelError::Integrity(format!("malformed watcher payload: {e}")))?;

    let occurred_at = parse_local_timestamp(&payload.timestamp)?;
    let kind = map_raw_kind(&payload.kind).ok_or_else(|| {
        SentinelError::Integrity(format!("unknown event kind '{}'", payload.kind))
    })?;

    let size = payload.size.as_ref().map(SizeField::bytes).unwrap_or(0);
    let action_ref = Some(payload.cmd_file).filter(|c| !c.trim().is_empty());

    Ok(Notification {
        occurred_at,
        kind,
        raw_kind: payload.kind,
        directory: payload.directory,
        path: payload.path,
        old_path: payload.old_path,
        size,
        action_ref,
    })
}

fn parse_local_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT).map_err(|e| {
        SentinelError::Integrity(format!("invalid timestamp '{text}': {e}"))
    })?;
    // Ambiguous local times (DST fold) resolve to the earlier instant.
    let local = Local.from_local_datetime(&naive).earliest().ok_or_else(|| {
        SentinelError::Integrity(format!("timestamp '{text}' does not exist in local time"))
    })?;
    Ok(local.with_timezone(&Utc))
}
