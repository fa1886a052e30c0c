// src/engine/rule.rs

//! Compiled rules: config entries with their match expression parsed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::config::RuleConfig;
use crate::errors::{HookrunError, Result};
use crate::predicate::{MatchExpr, Never, Predicate};
use crate::types::{ExecSpec, RuleId, parse_duration};

/// Event name that matches every event type.
pub const WILDCARD: &str = "*";

/// Immutable rule as used by the dispatcher and executor.
///
/// Execution state is not stored here; the core owns it per [`RuleId`].
#[derive(Debug)]
pub struct Rule {
    pub id: RuleId,
    pub event: String,
    pub match_source: String,
    pub predicate: Box<dyn Predicate>,
    pub exec: ExecSpec,
    pub report: Option<String>,
    pub timeout: Option<Duration>,
}

impl Rule {
    /// Compile a config entry.
    ///
    /// An unparseable match expression is not an error: the rule is kept but
    /// never fires. An invalid timeout is.
    pub fn from_config(id: RuleId, cfg: &RuleConfig) -> Result<Self> {
        let predicate: Box<dyn Predicate> = match MatchExpr::parse(&cfg.match_expr) {
            Ok(expr) => Box::new(expr),
            Err(e) => {
                warn!(
                    rule = id,
                    event = %cfg.event,
                    match_expr = %cfg.match_expr,
                    error = %e,
                    "match expression does not parse; rule will never fire"
                );
                Box::new(Never)
            }
        };

        let timeout = cfg
            .timeout
            .as_deref()
            .map(parse_duration)
            .transpose()
            .map_err(|e| HookrunError::ConfigError(format!("rule #{id}: {e}")))?;

        Ok(Self {
            id,
            event: cfg.event.clone(),
            match_source: cfg.match_expr.clone(),
            predicate,
            exec: cfg.exec.clone(),
            report: cfg.report.clone(),
            timeout,
        })
    }

    /// True if this rule listens to `event_type` (or to everything).
    pub fn applies_to(&self, event_type: &str) -> bool {
        self.event == WILDCARD || self.event == event_type
    }

    /// Whether the executor has to capture output for this rule.
    pub fn needs_capture(&self, logging: bool) -> bool {
        logging || self.report.is_some()
    }
}

/// `event="push", match="ref == x", exec="./deploy.sh"`
impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "event=\"{}\", match=\"{}\", exec=\"{}\"",
            self.event, self.match_source, self.exec
        )
    }
}

/// Compile all configured rules in declaration order.
pub fn compile_rules(configs: &[RuleConfig]) -> Result<Vec<Arc<Rule>>> {
    configs
        .iter()
        .enumerate()
        .map(|(id, cfg)| Rule::from_config(id, cfg).map(Arc::new))
        .collect()
}
