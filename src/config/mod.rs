// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a file and layering CLI overrides on top.
//! - `validate.rs`: `RawConfigFile -> ConfigFile` with invariant checks.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_for_cli, load_from_path};
pub use model::{
    CoalesceSection, ConfigFile, DispatchSection, IngestSection, RawConfigFile, StoreSection,
};
