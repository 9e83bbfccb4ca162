// src/dispatch/mod.rs

//! Dispatch Loop.

pub mod dispatcher;

pub use dispatcher::{Dispatcher, TickReport};
