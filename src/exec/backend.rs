// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender.
//! This makes it easy to swap in a fake executor in tests while keeping the
//! production executor in [`executor_loop`](super::executor_loop).
//!
//! - `RealExecutorBackend` is the implementation used by `hookrun`. It wraps
//!   the `spawn_executor` loop and forwards scheduled runs over a channel.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which rules were scheduled and directly emits `RunCompleted` events.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::{RuntimeEvent, ScheduledRun};
use crate::errors::{Error, Result};

use super::executor_loop::spawn_executor;
use super::ExecSettings;

/// Trait abstracting how scheduled runs are executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given runs for execution.
    ///
    /// Implementations must eventually answer every run with exactly one
    /// `RuntimeEvent::RunCompleted` for its rule.
    fn spawn_runs(
        &mut self,
        runs: Vec<ScheduledRun>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ScheduledRun>,
}

impl RealExecutorBackend {
    /// Create a new real executor backend, wiring it to the given runtime
    /// event sender.
    ///
    /// This spawns the background executor loop immediately.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, settings: ExecSettings) -> Self {
        let tx = spawn_executor(runtime_tx, Arc::new(settings));
        Self { tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_runs(
        &mut self,
        runs: Vec<ScheduledRun>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for run in runs {
                tx.send(run).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }
}
