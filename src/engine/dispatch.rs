// src/engine/dispatch.rs

//! Rule dispatch: which rules does an event fire?

use std::sync::Arc;

use crate::engine::rule::Rule;
use crate::types::Event;

/// Rules that fire for `event`, in declaration order.
///
/// A rule fires when its event type matches (or is `*`) and its predicate
/// accepts the payload.
pub fn matching_rules<'a>(
    rules: &'a [Arc<Rule>],
    event: &'a Event,
) -> impl Iterator<Item = &'a Arc<Rule>> + 'a {
    rules
        .iter()
        .filter(move |rule| rule.applies_to(&event.event_type))
        .filter(move |rule| rule.predicate.matches(&event.payload))
}
