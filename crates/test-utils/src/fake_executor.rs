use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use hookrun::engine::{RunOutcome, RuntimeEvent, ScheduledRun};
use hookrun::errors::Result;
use hookrun::exec::ExecutorBackend;
use hookrun::types::RuleId;

/// One run as seen by the fake executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRun {
    pub rule: RuleId,
    pub delivery_id: String,
}

/// A fake executor that:
/// - records which rules were "run" and with which delivery
/// - in auto-complete mode, immediately reports `RunCompleted(Exited(0))`
///   for each scheduled run; otherwise the test completes runs itself.
pub struct FakeExecutor {
    runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<RecordedRun>>>,
    auto_complete: bool,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<RecordedRun>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            auto_complete: true,
        }
    }

    /// Record runs without completing them.
    pub fn manual(
        runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<RecordedRun>>>,
    ) -> Self {
        Self {
            auto_complete: false,
            ..Self::new(runtime_tx, executed)
        }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_runs(
        &mut self,
        runs: Vec<ScheduledRun>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let auto_complete = self.auto_complete;

        Box::pin(async move {
            for run in runs {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(RecordedRun {
                        rule: run.rule.id,
                        delivery_id: run.event.delivery_id.clone(),
                    });
                }

                if auto_complete {
                    tx.send(RuntimeEvent::RunCompleted {
                        rule: run.rule.id,
                        outcome: RunOutcome::Exited(0),
                    })
                    .await
                    .map_err(anyhow::Error::from)?;
                }
            }
            Ok(())
        })
    }
}
