use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

/// Index of a rule in declaration order.
pub type RuleId = usize;

/// A normalized inbound webhook event.
///
/// Immutable once received; the runtime shares it between rules via `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: String,
    pub delivery_id: String,
    pub payload: Value,
}

impl Event {
    pub fn new(
        event_type: impl Into<String>,
        delivery_id: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            delivery_id: delivery_id.into(),
            payload,
        }
    }
}

/// The command a rule executes.
///
/// - `Shell`: a single string run through the platform shell (`sh -c`).
/// - `Argv`: an explicit argument vector, run directly without a shell.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExecSpec {
    Shell(String),
    Argv(Vec<String>),
}

impl ExecSpec {
    pub fn is_empty(&self) -> bool {
        match self {
            ExecSpec::Shell(s) => s.trim().is_empty(),
            ExecSpec::Argv(argv) => argv.first().is_none_or(|p| p.is_empty()),
        }
    }
}

impl fmt::Display for ExecSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecSpec::Shell(s) => f.write_str(s),
            ExecSpec::Argv(argv) => f.write_str(&argv.join(" ")),
        }
    }
}

impl From<&str> for ExecSpec {
    fn from(s: &str) -> Self {
        ExecSpec::Shell(s.to_string())
    }
}

/// Where completed-run records are appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stdout,
    Stderr,
}

impl FromStr for LogTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("log target must not be empty".to_string()),
            "-" | "stdout" => Ok(LogTarget::Stdout),
            "stderr" => Ok(LogTarget::Stderr),
            path => Ok(LogTarget::File(PathBuf::from(path))),
        }
    }
}

impl fmt::Display for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTarget::File(path) => write!(f, "{}", path.display()),
            LogTarget::Stdout => f.write_str("stdout"),
            LogTarget::Stderr => f.write_str("stderr"),
        }
    }
}

/// Parse a duration string like `"500ms"`, `"30s"`, `"5m"` or `"1h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{unit}'; expected ms, s, m, or h"
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
