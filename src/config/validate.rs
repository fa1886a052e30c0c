// src/config/validate.rs

use crate::config::model::{ConfigFile, DEFAULT_PATH, RawConfigFile, RuleConfig};
use crate::env::DEFAULT_PREFIX;
use crate::errors::{HookrunError, Result};
use crate::types::{LogTarget, parse_duration};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = HookrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let port = raw.port.ok_or_else(|| {
            HookrunError::ConfigError("must provide a 'port' option".to_string())
        })?;

        let path = validate_path(raw.path)?;
        let log = raw
            .log
            .map(|s| s.parse::<LogTarget>().map_err(HookrunError::ConfigError))
            .transpose()?;
        let env_prefix = validate_env_prefix(raw.env_prefix)?;

        for (idx, rule) in raw.rules.iter().enumerate() {
            validate_rule(idx, rule)?;
        }

        Ok(ConfigFile {
            port,
            host: raw.host.filter(|h| !h.trim().is_empty()),
            secret: raw.secret.filter(|s| !s.is_empty()),
            path,
            log,
            env_prefix,
            rules: raw.rules,
        })
    }
}

fn validate_path(path: Option<String>) -> Result<String> {
    let path = path.unwrap_or_else(|| DEFAULT_PATH.to_string());
    if !path.starts_with('/') {
        return Err(HookrunError::ConfigError(format!(
            "path must start with '/' (got '{path}')"
        )));
    }
    Ok(path)
}

fn validate_env_prefix(prefix: Option<String>) -> Result<String> {
    let prefix = prefix.unwrap_or_else(|| DEFAULT_PREFIX.to_string());
    if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(HookrunError::ConfigError(format!(
            "env_prefix may only contain [A-Za-z0-9_] (got '{prefix}')"
        )));
    }
    Ok(prefix)
}

fn validate_rule(idx: usize, rule: &RuleConfig) -> Result<()> {
    if rule.event.trim().is_empty() {
        return Err(HookrunError::ConfigError(format!(
            "rule #{idx} has an empty `event`"
        )));
    }
    if rule.exec.is_empty() {
        return Err(HookrunError::ConfigError(format!(
            "rule #{idx} ({}) has an empty `exec`",
            rule.event
        )));
    }
    if let Some(report) = &rule.report {
        if report.trim().is_empty() {
            return Err(HookrunError::ConfigError(format!(
                "rule #{idx} ({}) has an empty `report`",
                rule.event
            )));
        }
    }
    if let Some(timeout) = &rule.timeout {
        parse_duration(timeout).map_err(|e| {
            HookrunError::ConfigError(format!(
                "rule #{idx} ({}) has an invalid `timeout`: {e}",
                rule.event
            ))
        })?;
    }
    Ok(())
}
