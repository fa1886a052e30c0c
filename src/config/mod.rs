// src/config/mod.rs

//! Configuration loading and validation for hookrun.
//!
//! Responsibilities:
//! - Define the file-backed data model (`model.rs`).
//! - Load a config file from disk and merge CLI overrides (`loader.rs`).
//! - Parse compact `event:match:exec` rules (`rule_string.rs`).
//! - Validate required fields and rule shapes (`validate.rs`).

pub mod loader;
pub mod model;
pub mod rule_string;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigOverrides, RawConfigFile, RuleConfig};
pub use rule_string::{collect_rule_strings, parse_rule_string};
