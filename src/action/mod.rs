// src/action/mod.rs

//! Turning a notification into a command and running it.
//!
//! - `cmd_file.rs`: JSON action files and the TTL cache.
//! - `resolver.rs`: the resolution chain picking a template per notification.
//! - `template.rs`: placeholder substitution and shell quoting.
//! - `runner.rs`: the [`ActionRunner`] seam and the shell implementation.

pub mod cmd_file;
pub mod resolver;
pub mod runner;
pub mod template;

pub use cmd_file::{ActionFileCache, ActionSet};
pub use resolver::{
    ActionChain, ActionResolver, DefaultAction, PerNotificationFile, StartupActionFile,
};
pub use runner::{ActionOutput, ActionRunner, ShellActionRunner};
pub use template::render;
