// src/engine/mod.rs

//! Rule execution coordinator.
//!
//! This module ties together:
//! - compiled rules (`rule`)
//! - the dispatcher deciding which rules an event fires (`dispatch`)
//! - the per-rule state machine with coalescing (`state`)
//! - the main runtime event loop that reacts to:
//!   - inbound webhook events
//!   - run completions reported by the executor
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::sync::Arc;

use crate::types::{Event, RuleId};

/// How a run ended, as reported by the executor.
///
/// The coordinator treats every outcome the same way (the rule goes idle or
/// re-runs); the distinction only feeds logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The primary command exited with this code (`-1` when killed by a signal).
    Exited(i32),
    /// The primary command could not be spawned.
    LaunchFailed,
    /// The primary command exceeded the rule's timeout and was killed.
    TimedOut,
    /// The run task itself failed (panicked) before finishing.
    Aborted,
}

/// Events flowing into the runtime from ingress, executor, signals.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A verified webhook event arrived.
    EventReceived(Arc<Event>),
    /// A run (primary command, log record and report) finished.
    RunCompleted { rule: RuleId, outcome: RunOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod dispatch;
pub mod event_handlers;
pub mod rule;
pub mod runtime;
pub mod state;

pub use core::CoreRuntime;
pub use dispatch::matching_rules;
pub use event_handlers::{CoreCommand, CoreStep, ScheduledRun};
pub use rule::{Rule, WILDCARD, compile_rules};
pub use runtime::Runtime;
pub use state::{RuleRunState, RuleState, TriggerDecision};
