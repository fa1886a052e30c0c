// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running rule commands, using
//! `tokio::process::Command`, and reporting back to the runtime via
//! `RuntimeEvent::RunCompleted`.
//!
//! - [`executor_loop`] owns the loop that turns scheduled runs into tasks.
//! - [`runner`] runs one rule: primary command, log record, report.
//! - [`command`] builds shell / argv commands with a private environment.
//! - [`output`] captures and interleaves stdout/stderr.
//! - [`log_sink`] is the shared append-only record destination.
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `RealExecutorBackend`, which tests can replace with a fake.

use std::sync::Arc;

use crate::env::BaseEnv;

pub mod backend;
pub mod command;
pub mod executor_loop;
pub mod log_sink;
pub mod output;
pub mod runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
pub use log_sink::LogSink;
pub use output::{CapturedOutput, OutputPipe};

/// Settings shared by every run.
#[derive(Debug, Clone)]
pub struct ExecSettings {
    /// Environment snapshot every run starts from.
    pub base_env: Arc<BaseEnv>,
    /// Prefix for projected payload variables.
    pub env_prefix: String,
    /// Where run records go; output is only captured when this is set or the
    /// rule has a report.
    pub log_sink: Option<Arc<LogSink>>,
}
