#![allow(dead_code)]

use hookrun::config::{ConfigFile, RawConfigFile, RuleConfig};
use hookrun::types::{Event, ExecSpec};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                port: Some(0),
                host: Some("127.0.0.1".to_string()),
                ..RawConfigFile::default()
            },
        }
    }

    pub fn with_rule(mut self, rule: RuleConfig) -> Self {
        self.config.rules.push(rule);
        self
    }

    pub fn with_secret(mut self, secret: &str) -> Self {
        self.config.secret = Some(secret.to_string());
        self
    }

    pub fn with_log(mut self, target: &str) -> Self {
        self.config.log = Some(target.to_string());
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.config.path = Some(path.to_string());
        self
    }

    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.config.env_prefix = Some(prefix.to_string());
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RuleConfig`.
pub struct RuleBuilder {
    rule: RuleConfig,
}

impl RuleBuilder {
    pub fn new(event: &str, match_expr: &str, exec: &str) -> Self {
        Self {
            rule: RuleConfig::new(event, match_expr, exec),
        }
    }

    pub fn argv(mut self, argv: &[&str]) -> Self {
        self.rule.exec = ExecSpec::Argv(argv.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn report(mut self, report: &str) -> Self {
        self.rule.report = Some(report.to_string());
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.rule.timeout = Some(timeout.to_string());
        self
    }

    pub fn build(self) -> RuleConfig {
        self.rule
    }
}

/// Build an event with the given type, delivery id and payload.
pub fn event(event_type: &str, delivery_id: &str, payload: serde_json::Value) -> Event {
    Event::new(event_type, delivery_id, payload)
}
