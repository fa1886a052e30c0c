// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated per-rule state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from the runtime channel
//! - sending `ScheduledRun`s to the executor
//! - handling shutdown
//!
//! Since only the core mutates rule state, and it handles one event at a
//! time, "go idle, then maybe re-run" is a single atomic step.

use std::sync::Arc;

use tracing::{info, warn};

use crate::engine::event_handlers::{
    CoreCommand, CoreStep, handle_event_received, handle_run_completed,
};
use crate::engine::rule::Rule;
use crate::engine::state::{RuleRunState, RuleState};
use crate::engine::RuntimeEvent;
use crate::types::RuleId;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    rules: Vec<Arc<Rule>>,
    states: Vec<RuleState>,
    /// Set once shutdown was requested: new events are refused, in-flight
    /// runs (and their pending re-runs) are allowed to finish.
    draining: bool,
}

impl CoreRuntime {
    /// Rule ids must equal their index, as produced by `compile_rules`.
    pub fn new(rules: Vec<Arc<Rule>>) -> Self {
        for (idx, rule) in rules.iter().enumerate() {
            if rule.id != idx {
                warn!(rule = rule.id, index = idx, "rule id does not match its position");
            }
        }
        let states = vec![RuleState::Idle; rules.len()];
        Self {
            rules,
            states,
            draining: false,
        }
    }

    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    /// True when no rule has a run in flight.
    pub fn is_idle(&self) -> bool {
        self.states.iter().all(RuleState::is_idle)
    }

    /// Read-only state of a rule (for tests and diagnostics).
    pub fn state_of(&self, rule: RuleId) -> Option<RuleRunState> {
        self.states.get(rule).map(RuleRunState::from)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        let mut step = match event {
            RuntimeEvent::EventReceived(event) => {
                if self.draining {
                    warn!(
                        event_type = %event.event_type,
                        delivery = %event.delivery_id,
                        "shutting down; event not dispatched"
                    );
                    CoreStep {
                        commands: Vec::new(),
                        keep_running: true,
                    }
                } else {
                    handle_event_received(&self.rules, &mut self.states, event)
                }
            }
            RuntimeEvent::RunCompleted { rule, outcome } => {
                handle_run_completed(&self.rules, &mut self.states, rule, outcome)
            }
            RuntimeEvent::ShutdownRequested => {
                info!("shutdown requested; waiting for in-flight runs");
                self.draining = true;
                CoreStep {
                    commands: Vec::new(),
                    keep_running: true,
                }
            }
        };

        if self.draining && self.is_idle() {
            step.commands.push(CoreCommand::RequestExit);
            step.keep_running = false;
        }

        step
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::RuleConfig;
    use crate::engine::compile_rules;
    use crate::engine::RunOutcome;
    use crate::types::Event;

    fn core() -> CoreRuntime {
        CoreRuntime::new(
            compile_rules(&[
                RuleConfig::new("push", "ref == refs/heads/main", "sleep 1"),
                RuleConfig::new("issues", "action == opened", "echo issue"),
            ])
            .unwrap(),
        )
    }

    fn push(id: &str) -> RuntimeEvent {
        RuntimeEvent::EventReceived(Arc::new(Event::new(
            "push",
            id,
            json!({ "ref": "refs/heads/main" }),
        )))
    }

    fn dispatched(step: &CoreStep) -> Vec<(RuleId, String)> {
        step.commands
            .iter()
            .flat_map(|c| match c {
                CoreCommand::DispatchRuns(runs) => runs
                    .iter()
                    .map(|r| (r.rule.id, r.event.delivery_id.clone()))
                    .collect(),
                CoreCommand::RequestExit => Vec::new(),
            })
            .collect()
    }

    fn completed(rule: RuleId) -> RuntimeEvent {
        RuntimeEvent::RunCompleted {
            rule,
            outcome: RunOutcome::Exited(0),
        }
    }

    #[test]
    fn many_triggers_while_running_yield_one_rerun() {
        let mut core = core();

        assert_eq!(dispatched(&core.step(push("d1"))), vec![(0, "d1".to_string())]);
        for id in ["d2", "d3", "d4", "d5"] {
            assert!(dispatched(&core.step(push(id))).is_empty());
        }
        assert_eq!(core.state_of(0), Some(RuleRunState::RunningWithPending));

        // The re-run replays the event that started the in-flight run.
        assert_eq!(dispatched(&core.step(completed(0))), vec![(0, "d1".to_string())]);
        assert!(dispatched(&core.step(completed(0))).is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn failed_launch_still_honours_pending_rerun() {
        let mut core = core();
        core.step(push("d1"));
        core.step(push("d2"));

        let step = core.step(RuntimeEvent::RunCompleted {
            rule: 0,
            outcome: RunOutcome::LaunchFailed,
        });
        assert_eq!(dispatched(&step).len(), 1);
    }

    #[test]
    fn spurious_completion_is_ignored() {
        let mut core = core();
        let step = core.step(completed(1));
        assert!(step.commands.is_empty());
        assert!(step.keep_running);

        let step = core.step(completed(42));
        assert!(step.commands.is_empty());
    }

    #[test]
    fn shutdown_waits_for_in_flight_runs() {
        let mut core = core();
        core.step(push("d1"));
        core.step(push("d2"));

        let step = core.step(RuntimeEvent::ShutdownRequested);
        assert!(step.keep_running);

        // Events after shutdown are refused.
        let step = core.step(RuntimeEvent::EventReceived(Arc::new(Event::new(
            "issues",
            "d3",
            json!({ "action": "opened" }),
        ))));
        assert!(dispatched(&step).is_empty());

        // The accepted pending re-run still happens.
        let step = core.step(completed(0));
        assert_eq!(dispatched(&step).len(), 1);
        assert!(step.keep_running);

        let step = core.step(completed(0));
        assert!(!step.keep_running);
        assert!(matches!(step.commands.last(), Some(CoreCommand::RequestExit)));
    }

    #[test]
    fn shutdown_when_idle_exits_immediately() {
        let mut core = core();
        let step = core.step(RuntimeEvent::ShutdownRequested);
        assert!(!step.keep_running);
    }
}
