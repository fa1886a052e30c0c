// src/config/rule_string.rs

//! Compact `event:match:exec` rule strings from the command line.

use tracing::debug;

use crate::config::model::RuleConfig;
use crate::types::ExecSpec;

/// Parse one compact rule.
///
/// Splits on the first two colons only, so the command may contain colons
/// itself. Returns `None` when a delimiter is missing or a field is empty.
pub fn parse_rule_string(s: &str) -> Option<RuleConfig> {
    let (event, rest) = s.split_once(':')?;
    let (match_expr, exec) = rest.split_once(':')?;

    if event.is_empty() || match_expr.is_empty() || exec.is_empty() {
        return None;
    }

    Some(RuleConfig {
        event: event.to_string(),
        match_expr: match_expr.to_string(),
        exec: ExecSpec::Shell(exec.to_string()),
        report: None,
        timeout: None,
    })
}

/// Parse many compact rules, silently dropping malformed ones.
pub fn collect_rule_strings(rules: &[String]) -> Vec<RuleConfig> {
    rules
        .iter()
        .filter_map(|s| {
            let parsed = parse_rule_string(s);
            if parsed.is_none() {
                debug!(rule = %s, "discarding malformed rule string");
            }
            parsed
        })
        .collect()
}
