// src/predicate/mod.rs

//! Rule match expressions.
//!
//! The dispatcher only sees the [`Predicate`] trait: "does this payload
//! satisfy the rule?". The built-in implementation is [`MatchExpr`], a small
//! boolean expression language over dotted payload paths:
//!
//! ```text
//! ref == refs/heads/master && repository.name == hookrun
//! action ~= /^(opened|reopened)$/ || !sender.site_admin
//! pull_request.commits >= 3
//! ```
//!
//! - [`parser`] turns the expression string into an AST.
//! - [`expr`] evaluates that AST against a JSON payload.

pub mod expr;
pub mod parser;

use std::fmt::Debug;

use serde_json::Value;

pub use expr::MatchExpr;
pub use parser::{CmpOp, Expr, Literal};

/// Anything that can decide whether a payload matches a rule.
pub trait Predicate: Send + Sync + Debug {
    fn matches(&self, payload: &Value) -> bool;
}

/// A predicate that never matches.
///
/// Rules whose match expression fails to parse carry this so they simply
/// never fire.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl Predicate for Never {
    fn matches(&self, _payload: &Value) -> bool {
        false
    }
}
