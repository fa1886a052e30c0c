// src/predicate/expr.rs

//! Evaluation of parsed match expressions against JSON payloads.

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;

use crate::errors::Result;
use crate::predicate::parser::{self, CmpOp, Expr, Literal};
use crate::predicate::Predicate;

/// A compiled match expression.
#[derive(Debug, Clone)]
pub struct MatchExpr {
    source: String,
    expr: Expr,
}

impl MatchExpr {
    pub fn parse(source: &str) -> Result<Self> {
        let expr = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for MatchExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Predicate for MatchExpr {
    fn matches(&self, payload: &Value) -> bool {
        eval(&self.expr, payload)
    }
}

fn eval(expr: &Expr, payload: &Value) -> bool {
    match expr {
        Expr::Or(lhs, rhs) => eval(lhs, payload) || eval(rhs, payload),
        Expr::And(lhs, rhs) => eval(lhs, payload) && eval(rhs, payload),
        Expr::Not(inner) => !eval(inner, payload),
        Expr::Truthy(path) => resolve(payload, path).is_some_and(truthy),
        Expr::Compare { path, op, rhs } => match resolve(payload, path) {
            Some(value) => compare(value, *op, rhs),
            None => *op == CmpOp::Ne,
        },
    }
}

/// Walk a dotted path. Numeric segments index into arrays.
fn resolve<'a>(payload: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(payload, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Scalar rendering used by the string operators.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn compare(value: &Value, op: CmpOp, rhs: &Literal) -> bool {
    let (text, quoted) = match rhs {
        Literal::Regex(re) => {
            return op == CmpOp::Matches && scalar_text(value).is_some_and(|s| re.is_match(&s));
        }
        Literal::Text { text, quoted } => (text.as_str(), *quoted),
    };

    match op {
        CmpOp::Eq => loose_eq(value, text, quoted),
        CmpOp::Ne => !loose_eq(value, text, quoted),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let Some(ordering) = order(value, text) else {
                return false;
            };
            match op {
                CmpOp::Lt => ordering == Ordering::Less,
                CmpOp::Le => ordering != Ordering::Greater,
                CmpOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }
        }
        CmpOp::StartsWith => scalar_text(value).is_some_and(|s| s.starts_with(text)),
        CmpOp::EndsWith => scalar_text(value).is_some_and(|s| s.ends_with(text)),
        CmpOp::Contains => match value {
            Value::Array(items) => items.iter().any(|item| loose_eq(item, text, quoted)),
            other => scalar_text(other).is_some_and(|s| s.contains(text)),
        },
        // Text literals for `~=` are compiled to regexes by the parser.
        CmpOp::Matches => false,
    }
}

fn loose_eq(value: &Value, text: &str, quoted: bool) -> bool {
    match value {
        Value::Null => !quoted && text == "null",
        Value::Bool(b) => text == if *b { "true" } else { "false" },
        Value::Number(n) => text
            .trim()
            .parse::<f64>()
            .ok()
            .zip(n.as_f64())
            .is_some_and(|(a, b)| a == b),
        Value::String(s) => {
            s == text
                || (!quoted
                    && matches!(
                        (s.trim().parse::<f64>(), text.parse::<f64>()),
                        (Ok(a), Ok(b)) if a == b
                    ))
        }
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn order(value: &Value, text: &str) -> Option<Ordering> {
    if let (Some(lhs), Ok(rhs)) = (as_number(value), text.trim().parse::<f64>()) {
        return lhs.partial_cmp(&rhs);
    }
    match value {
        Value::String(s) => Some(s.as_str().cmp(text)),
        _ => None,
    }
}
