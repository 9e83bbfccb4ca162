// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `backup-sentinel`.
///
/// Without a mode flag the binary runs as a producer: the trailing arguments
/// are one raw payload from the directory watcher, which is parsed and
/// appended to the store.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "backup-sentinel",
    version,
    about = "Queue directory-watcher notifications, coalesce them and dispatch one command per change.",
    long_about = None
)]
pub struct CliArgs {
    /// Run the dispatch loop against the store.
    #[arg(long, conflicts_with_all = ["check", "watch"])]
    pub consumer: bool,

    /// Print the pending window and exit without dispatching.
    #[arg(long, conflicts_with = "watch")]
    pub check: bool,

    /// Watch DIR natively and dispatch from the same process.
    #[arg(long, value_name = "DIR")]
    pub watch: Option<PathBuf>,

    /// With `--consumer`: run a single dispatch tick and exit.
    #[arg(long)]
    pub once: bool,

    /// Path to the config file (TOML).
    ///
    /// Default: `sentinel.toml` in the working directory, if it exists.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// SQLite database path; overrides `[store].path`.
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Default action template; overrides `[dispatch].default_action`.
    #[arg(long, value_name = "TEMPLATE")]
    pub cmd: Option<String>,

    /// JSON action file; overrides `[dispatch].action_file`.
    #[arg(long, value_name = "PATH")]
    pub cmd_file: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SENTINEL_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Raw watcher payload (producer mode). Multiple arguments are joined
    /// with single spaces.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "PAYLOAD")]
    pub payload: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Which of the mutually exclusive modes the arguments select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Producer,
    Consumer { once: bool },
    Check,
    Watch(PathBuf),
}

impl CliArgs {
    pub fn mode(&self) -> Mode {
        if let Some(dir) = &self.watch {
            Mode::Watch(dir.clone())
        } else if self.check {
            Mode::Check
        } else if self.consumer {
            Mode::Consumer { once: self.once }
        } else {
            Mode::Producer
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_arguments_select_producer_mode() {
        let args = CliArgs::try_parse_from([
            "backup-sentinel",
            r#"{"t":"2025/11/3 16:43:40","#,
            r#""e":"删除"}"#,
        ])
        .unwrap();
        assert_eq!(args.mode(), Mode::Producer);
        assert_eq!(args.payload.len(), 2);
    }

    #[test]
    fn consumer_and_check_conflict() {
        let res = CliArgs::try_parse_from(["backup-sentinel", "--consumer", "--check"]);
        assert!(res.is_err());
    }

    #[test]
    fn consumer_once() {
        let args =
            CliArgs::try_parse_from(["backup-sentinel", "--consumer", "--once"]).unwrap();
        assert_eq!(args.mode(), Mode::Consumer { once: true });
    }
}
