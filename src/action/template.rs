// src/action/template.rs

//! Action template rendering.
//!
//! Placeholders:
//! - `%fullfile%`: the notification's path.
//! - `%oldfullfile%`: the pre-merge path of a MOVE, empty for other kinds.
//!
//! Substituted values are shell-quoted and never re-scanned, so a path that
//! itself contains `%fullfile%` is inserted literally. A template without
//! `%fullfile%` gets ` fullfile <path>` appended.

use crate::store::StoredNotification;
use crate::types::EventKind;

pub const FULLFILE: &str = "%fullfile%";
pub const OLDFULLFILE: &str = "%oldfullfile%";

/// Render `template` into a concrete shell command for `notification`.
pub fn render(template: &str, notification: &StoredNotification) -> String {
    let path = notification.path();
    let old_path = if notification.kind() == EventKind::Move {
        notification.notification.old_path.as_str()
    } else {
        ""
    };

    let mut out = String::with_capacity(template.len() + path.len() + old_path.len());
    let mut rest = template;
    let mut saw_fullfile = false;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix(FULLFILE) {
            out.push_str(&shell_quote(path));
            saw_fullfile = true;
            rest = after;
        } else if let Some(after) = tail.strip_prefix(OLDFULLFILE) {
            out.push_str(&shell_quote(old_path));
            rest = after;
        } else {
            out.push('%');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);

    if !saw_fullfile {
        out.push_str(" fullfile ");
        out.push_str(&shell_quote(path));
    }
    out
}

/// Quote `value` as one argument for the platform shell used by
/// [`ShellActionRunner`](crate::action::ShellActionRunner).
pub fn shell_quote(value: &str) -> String {
    if cfg!(windows) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::store::Notification;
    use crate::types::NotificationState;

    fn stored(kind: EventKind, path: &str, old_path: &str) -> StoredNotification {
        let mut n = Notification::new(Utc::now(), kind, path);
        n.old_path = old_path.to_string();
        StoredNotification {
            id: 1,
            state: NotificationState::Pending,
            notification: n,
        }
    }

    #[test]
    fn placeholder_is_replaced_with_quoted_path() {
        let n = stored(EventKind::Create, "/data/my photo.jpg", "");
        assert_eq!(
            render("cp %fullfile% /backup/", &n),
            "cp '/data/my photo.jpg' /backup/"
        );
    }

    #[test]
    fn missing_placeholder_appends_fullfile_argument() {
        let n = stored(EventKind::Modify, "/data/a.txt", "");
        assert_eq!(render("notify-backup", &n), "notify-backup fullfile '/data/a.txt'");
    }

    #[test]
    fn old_path_only_for_moves() {
        let moved = stored(EventKind::Move, "/b/x", "/a/x");
        assert_eq!(render("mv %oldfullfile% %fullfile%", &moved), "mv '/a/x' '/b/x'");

        let renamed = stored(EventKind::Rename, "/b/x", "/a/x");
        assert_eq!(render("mv %oldfullfile% %fullfile%", &renamed), "mv '' '/b/x'");
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let n = stored(EventKind::Create, "/odd/%fullfile%", "");
        assert_eq!(render("echo %fullfile%", &n), "echo '/odd/%fullfile%'");
    }

    #[test]
    fn single_quotes_are_escaped() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn stray_percent_signs_survive() {
        let n = stored(EventKind::Create, "/a", "");
        assert_eq!(render("date +%s %fullfile% 100%", &n), "date +%s '/a' 100%");
    }
}
