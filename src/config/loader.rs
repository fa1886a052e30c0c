// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{ConfigFile, ConfigOverrides, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file without validating it.
///
/// Files ending in `.json` are parsed as JSON, everything else as TOML.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config: RawConfigFile = if is_json {
        serde_json::from_str(&contents)?
    } else {
        toml::from_str(&contents)?
    };

    Ok(config)
}

/// Load the optional config file, merge CLI overrides and validate.
///
/// This is the entry point the binary uses:
///
/// - no file: start from an empty config (everything from flags)
/// - file values are replaced by any `Some` override
/// - compact `--rule` strings are appended after file rules
pub fn load_and_validate(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<ConfigFile> {
    let mut raw = match path {
        Some(p) => load_from_path(p)?,
        None => RawConfigFile::default(),
    };
    raw.merge(overrides);
    ConfigFile::try_from(raw)
}
