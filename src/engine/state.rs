// src/engine/state.rs

//! Per-rule execution state.

use std::sync::Arc;

use crate::types::Event;

/// Execution state of a single rule (internal).
///
/// The retained event is the one that started the current run; a coalesced
/// re-run replays it.
#[derive(Debug, Clone, Default)]
pub enum RuleState {
    #[default]
    Idle,
    /// A run is in flight.
    Running { event: Arc<Event> },
    /// A run is in flight and at least one more trigger arrived meanwhile.
    RunningWithPending { event: Arc<Event> },
}

/// What a trigger did to the state.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerDecision {
    /// The rule was idle; start a run for this event.
    Start(Arc<Event>),
    /// A run is in flight; the trigger folded into the single pending re-run.
    Coalesced,
}

/// Public, read-only view of a rule's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleRunState {
    Idle,
    Running,
    RunningWithPending,
}

impl From<&RuleState> for RuleRunState {
    fn from(state: &RuleState) -> Self {
        match state {
            RuleState::Idle => RuleRunState::Idle,
            RuleState::Running { .. } => RuleRunState::Running,
            RuleState::RunningWithPending { .. } => RuleRunState::RunningWithPending,
        }
    }
}

impl RuleState {
    pub fn is_idle(&self) -> bool {
        matches!(self, RuleState::Idle)
    }

    /// Apply a trigger.
    pub fn trigger(&mut self, event: Arc<Event>) -> TriggerDecision {
        match std::mem::take(self) {
            RuleState::Idle => {
                *self = RuleState::Running {
                    event: Arc::clone(&event),
                };
                TriggerDecision::Start(event)
            }
            RuleState::Running { event: current }
            | RuleState::RunningWithPending { event: current } => {
                *self = RuleState::RunningWithPending { event: current };
                TriggerDecision::Coalesced
            }
        }
    }

    /// Apply a run completion.
    ///
    /// Returns the retained event if a re-run is due, in which case the state
    /// stays `Running`. Completing an idle rule is a no-op.
    pub fn complete(&mut self) -> Option<Arc<Event>> {
        match std::mem::take(self) {
            RuleState::Idle | RuleState::Running { .. } => None,
            RuleState::RunningWithPending { event } => {
                *self = RuleState::Running {
                    event: Arc::clone(&event),
                };
                Some(event)
            }
        }
    }
}
