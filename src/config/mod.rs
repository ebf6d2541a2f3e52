// src/config/mod.rs

//! TOML graph descriptions.
//!
//! - `model.rs`: the serde data model.
//! - `loader.rs`: reading a file from disk.
//! - `validate.rs`: `RawConfigFile` → `ConfigFile` checks.
//! - `build.rs`: `ConfigFile` → `StreamGraph`.

pub mod build;
pub mod loader;
pub mod model;
pub mod validate;

pub use build::build_graph;
pub use loader::{load_and_validate, load_from_path};
pub use model::{ColumnSpec, ConfigFile, RawConfigFile, SchedulerSection, StreamConfig, StreamKind};
