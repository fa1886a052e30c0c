// src/engine/runtime.rs

//! Async shell around [`CoreRuntime`].

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Feeds webhook events and run completions into the core and hands the runs
/// it schedules to an `ExecutorBackend`.
///
/// The loop never waits on a subprocess; the only await points are the
/// channel and the executor hand-off.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    stats: RuntimeStats,
}

/// Counters reported when the runtime stops.
#[derive(Debug, Default, Clone, Copy)]
struct RuntimeStats {
    events: u64,
    runs_dispatched: u64,
    completions: u64,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            stats: RuntimeStats::default(),
        }
    }

    /// Process events until the core asks to exit (shutdown drained) or every
    /// sender is gone.
    ///
    /// Returns the core so callers can inspect final rule states.
    pub async fn run(mut self) -> Result<CoreRuntime> {
        info!(rules = self.core.rules().len(), "hookrun runtime started");

        while let Some(event) = self.event_rx.recv().await {
            self.record(&event);

            let step = self.core.step(event);
            let mut exit = !step.keep_running;

            for command in step.commands {
                match command {
                    CoreCommand::DispatchRuns(runs) if !runs.is_empty() => {
                        self.stats.runs_dispatched += runs.len() as u64;
                        self.executor.spawn_runs(runs).await?;
                    }
                    CoreCommand::DispatchRuns(_) => {}
                    CoreCommand::RequestExit => exit = true,
                }
            }

            if exit {
                break;
            }
        }

        info!(
            events = self.stats.events,
            runs = self.stats.runs_dispatched,
            completions = self.stats.completions,
            idle = self.core.is_idle(),
            "hookrun runtime stopped"
        );
        Ok(self.core)
    }

    /// Count and trace an incoming event without dumping the payload.
    fn record(&mut self, event: &RuntimeEvent) {
        match event {
            RuntimeEvent::EventReceived(e) => {
                self.stats.events += 1;
                debug!(
                    event_type = %e.event_type,
                    delivery = %e.delivery_id,
                    "runtime received webhook event"
                );
            }
            RuntimeEvent::RunCompleted { rule, outcome } => {
                self.stats.completions += 1;
                debug!(rule, ?outcome, "runtime received run completion");
            }
            RuntimeEvent::ShutdownRequested => debug!("runtime received shutdown request"),
        }
    }
}
