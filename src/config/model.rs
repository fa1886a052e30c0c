// src/config/model.rs

use serde::Deserialize;

use crate::types::{ExecSpec, LogTarget};

/// Top-level configuration as read from a TOML (or JSON) file.
///
/// ```toml
/// port = 9999
/// secret = "s3cret"
/// path = "/webhook"
/// log = "/var/log/hookrun.log"
///
/// [[rules]]
/// event = "push"
/// match = "ref == refs/heads/master"
/// exec = "./deploy.sh"
/// report = "./notify.sh"
/// ```
///
/// Every field is optional at this stage; CLI flags are merged in before
/// validation turns this into a [`ConfigFile`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub host: Option<String>,

    /// HMAC secret for `X-Hub-Signature-256`. No verification when absent.
    #[serde(default)]
    pub secret: Option<String>,

    /// Endpoint path, default `/webhook`.
    #[serde(default)]
    pub path: Option<String>,

    /// File path, or `stdout` / `-` / `stderr`.
    #[serde(default)]
    pub log: Option<String>,

    /// Prefix for projected payload variables, default `gh_`.
    #[serde(default)]
    pub env_prefix: Option<String>,

    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// One `[[rules]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Event type (`push`, `issues`, ...) or `*`.
    pub event: String,

    /// Match expression evaluated against the payload.
    #[serde(rename = "match")]
    pub match_expr: String,

    /// Shell string or argument vector.
    pub exec: ExecSpec,

    /// Shell string run after `exec` with its output in `<prefix>output`.
    #[serde(default)]
    pub report: Option<String>,

    /// Kill `exec` after this long (e.g. `"30s"`). No timeout when absent.
    #[serde(default)]
    pub timeout: Option<String>,
}

impl RuleConfig {
    pub fn new(event: &str, match_expr: &str, exec: impl Into<ExecSpec>) -> Self {
        Self {
            event: event.to_string(),
            match_expr: match_expr.to_string(),
            exec: exec.into(),
            report: None,
            timeout: None,
        }
    }
}

/// Values supplied on the command line; `Some` fields replace file values.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub secret: Option<String>,
    pub path: Option<String>,
    pub log: Option<String>,
    /// Compact `event:match:exec` rules, appended after file rules.
    pub rules: Vec<String>,
}

impl RawConfigFile {
    pub fn merge(&mut self, overrides: ConfigOverrides) {
        if overrides.port.is_some() {
            self.port = overrides.port;
        }
        if overrides.host.is_some() {
            self.host = overrides.host;
        }
        if overrides.secret.is_some() {
            self.secret = overrides.secret;
        }
        if overrides.path.is_some() {
            self.path = overrides.path;
        }
        if overrides.log.is_some() {
            self.log = overrides.log;
        }
        self.rules
            .extend(crate::config::rule_string::collect_rule_strings(&overrides.rules));
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub port: u16,
    pub host: Option<String>,
    pub secret: Option<String>,
    pub path: String,
    pub log: Option<LogTarget>,
    pub env_prefix: String,
    pub rules: Vec<RuleConfig>,
}

pub const DEFAULT_PATH: &str = "/webhook";

impl ConfigFile {
    /// Address to bind, `host:port` (all interfaces when no host is set).
    pub fn bind_addr(&self) -> String {
        let host = self.host.as_deref().unwrap_or("0.0.0.0");
        format!("{host}:{}", self.port)
    }
}
