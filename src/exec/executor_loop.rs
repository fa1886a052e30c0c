// src/exec/executor_loop.rs

//! Main executor loop that turns scheduled runs into tasks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, ScheduledRun};
use crate::exec::runner::run_rule;
use crate::exec::ExecSettings;
use crate::types::RuleId;

/// Spawn the background executor loop.
///
/// The returned sender is what `RealExecutorBackend` forwards runs to. Each
/// run executes in its own Tokio task, so runs of different rules are fully
/// concurrent and the loop itself never waits on a process. The core only
/// schedules a rule again after its `RunCompleted`, so there is at most one
/// live run per rule.
///
/// When the channel closes, the loop joins every run still in flight.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    settings: Arc<ExecSettings>,
) -> mpsc::Sender<ScheduledRun> {
    let (tx, mut rx) = mpsc::channel::<ScheduledRun>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<RuleId, JoinHandle<()>> = HashMap::new();

        while let Some(run) = rx.recv().await {
            handle_scheduled_run(run, &mut active, &settings, &runtime_tx);
        }

        info!(in_flight = active.len(), "executor loop closing; joining runs");
        for (rule, handle) in active.drain() {
            if let Err(e) = handle.await {
                warn!(rule, error = %e, "run task failed while joining");
            }
        }
        info!("executor loop finished (channel closed)");
    });

    tx
}

fn handle_scheduled_run(
    run: ScheduledRun,
    active: &mut HashMap<RuleId, JoinHandle<()>>,
    settings: &Arc<ExecSettings>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) {
    active.retain(|_, handle| !handle.is_finished());

    let rule_id = run.rule.id;

    // The previous task sends RunCompleted as its very last step, so it may
    // still be returning when the re-run arrives.
    if active.contains_key(&rule_id) {
        debug!(rule = rule_id, "previous run task still winding down");
    }

    let handle = tokio::spawn(run_rule(run, Arc::clone(settings), runtime_tx.clone()));

    if let Some(previous) = active.insert(rule_id, handle) {
        // Keep the old handle joined in the background rather than losing it.
        tokio::spawn(async move {
            if let Err(e) = previous.await {
                warn!(rule = rule_id, error = %e, "previous run task failed");
            }
        });
    }
}
