// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::engine::dispatch::matching_rules;
use crate::engine::rule::Rule;
use crate::engine::state::{RuleState, TriggerDecision};
use crate::engine::RunOutcome;
use crate::types::{Event, RuleId};

/// One run the executor should start.
#[derive(Debug, Clone)]
pub struct ScheduledRun {
    pub rule: Arc<Rule>,
    pub event: Arc<Event>,
}

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these runs to the executor.
    DispatchRuns(Vec<ScheduledRun>),
    /// Request that the runtime stops (shutdown requested and nothing in flight).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn continue_with(runs: Vec<ScheduledRun>) -> Self {
        let mut commands = Vec::new();
        if !runs.is_empty() {
            commands.push(CoreCommand::DispatchRuns(runs));
        }
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle an inbound event.
///
/// Every matching rule is triggered in declaration order:
/// - idle rules start a run with this event
/// - running rules record a single pending re-run (coalescing)
pub fn handle_event_received(
    rules: &[Arc<Rule>],
    states: &mut [RuleState],
    event: Arc<Event>,
) -> CoreStep {
    debug!(
        event_type = %event.event_type,
        delivery = %event.delivery_id,
        "dispatching event"
    );

    let mut runs = Vec::new();

    for rule in matching_rules(rules, &event) {
        let Some(state) = states.get_mut(rule.id) else {
            warn!(rule = rule.id, "matched rule has no state slot; ignoring");
            continue;
        };

        info!(rule = rule.id, "matched rule for {}", rule);

        match state.trigger(Arc::clone(&event)) {
            TriggerDecision::Start(event) => runs.push(ScheduledRun {
                rule: Arc::clone(rule),
                event,
            }),
            TriggerDecision::Coalesced => {
                debug!(
                    rule = rule.id,
                    delivery = %event.delivery_id,
                    "rule already running; queued a single re-run"
                );
            }
        }
    }

    CoreStep::continue_with(runs)
}

/// Handle a run completion: go idle, or start the pending re-run with the
/// retained event.
pub fn handle_run_completed(
    rules: &[Arc<Rule>],
    states: &mut [RuleState],
    rule_id: RuleId,
    outcome: RunOutcome,
) -> CoreStep {
    let (Some(rule), Some(state)) = (rules.get(rule_id), states.get_mut(rule_id)) else {
        warn!(rule = rule_id, "completion for unknown rule; ignoring");
        return CoreStep::continue_with(Vec::new());
    };

    if state.is_idle() {
        warn!(rule = rule_id, "completion for a rule that is not running; ignoring");
        return CoreStep::continue_with(Vec::new());
    }

    debug!(rule = rule_id, ?outcome, "run completed");

    let runs = match state.complete() {
        Some(event) => {
            info!(
                rule = rule_id,
                delivery = %event.delivery_id,
                "re-running rule for trigger received while it was running"
            );
            vec![ScheduledRun {
                rule: Arc::clone(rule),
                event,
            }]
        }
        None => Vec::new(),
    };

    CoreStep::continue_with(runs)
}
