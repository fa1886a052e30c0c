// src/exec/runner.rs

//! Execution of a single rule run: primary command, log record, report.

use std::collections::BTreeMap;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::engine::{RunOutcome, RuntimeEvent, ScheduledRun};
use crate::env::{env_value, output_var, project};
use crate::exec::command::{build_command, configure, shell_command};
use crate::exec::log_sink::format_record;
use crate::exec::output::{CapturedOutput, OutputPipe};
use crate::exec::ExecSettings;

/// How long to keep reading output after a timed-out command was killed.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// Per-run state: created when the run starts, dropped when it completes.
#[derive(Debug)]
pub struct ExecutionContext {
    pub started: Instant,
    /// Prefix for captured lines in the log record, e.g. `[push:72d3162e] `.
    pub log_prefix: String,
    /// Private environment: base snapshot overlaid with the projected payload.
    pub env: BTreeMap<String, String>,
}

impl ExecutionContext {
    pub fn new(run: &ScheduledRun, settings: &ExecSettings) -> Self {
        let projected = project(&run.event.payload, &settings.env_prefix);
        Self {
            started: Instant::now(),
            log_prefix: format!("[{}:{}] ", run.event.event_type, run.event.delivery_id),
            env: settings.base_env.overlay(&projected),
        }
    }
}

/// Run one scheduled rule to completion and report `RunCompleted`.
///
/// The completion is sent only after the log record is written and the
/// report command has finished, and it is sent even if the run panics, so
/// the rule can never get stuck in `Running`.
pub async fn run_rule(
    run: ScheduledRun,
    settings: Arc<ExecSettings>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let rule_id = run.rule.id;

    let outcome = match tokio::spawn(execute(run, settings)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(rule = rule_id, error = %e, "rule run aborted");
            RunOutcome::Aborted
        }
    };

    if runtime_tx
        .send(RuntimeEvent::RunCompleted {
            rule: rule_id,
            outcome,
        })
        .await
        .is_err()
    {
        debug!(rule = rule_id, "runtime gone; completion not delivered");
    }
}

async fn execute(run: ScheduledRun, settings: Arc<ExecSettings>) -> RunOutcome {
    let rule = &run.rule;
    let ctx = ExecutionContext::new(&run, &settings);
    let capture = rule.needs_capture(settings.log_sink.is_some());

    info!(
        rule = rule.id,
        delivery = %run.event.delivery_id,
        exec = %rule.exec,
        "starting rule command"
    );

    let spawned = build_command(&rule.exec).and_then(|mut cmd| {
        configure(&mut cmd, &ctx.env, capture);
        spawn(cmd)
    });

    let (mut child, pipe) = match spawned {
        Ok(child) => child,
        Err(e) => {
            error!(
                rule = rule.id,
                exec = %rule.exec,
                error = ?e,
                "error executing command"
            );
            return RunOutcome::LaunchFailed;
        }
    };

    let status = wait_for_exit(&mut child, rule.timeout).await;

    let output = match pipe {
        Some(pipe) if matches!(status, Ok(None)) => pipe.finish_within(KILL_GRACE).await,
        Some(pipe) => pipe.finish().await,
        None => CapturedOutput::default(),
    };
    let elapsed = ctx.started.elapsed();

    let outcome = match status {
        Ok(Some(status)) => {
            let code = status.code().unwrap_or(-1);
            info!(
                rule = rule.id,
                exit_code = code,
                success = status.success(),
                elapsed_ms = elapsed.as_millis() as u64,
                "executed command"
            );
            RunOutcome::Exited(code)
        }
        Ok(None) => {
            warn!(
                rule = rule.id,
                timeout = ?rule.timeout,
                "command timed out and was killed"
            );
            RunOutcome::TimedOut
        }
        Err(e) => {
            error!(rule = rule.id, error = ?e, "error waiting for command");
            RunOutcome::Exited(-1)
        }
    };

    if let Some(sink) = &settings.log_sink {
        let record = format_record(rule, Local::now(), elapsed, &output, &ctx.log_prefix);
        if let Err(e) = sink.append(&record).await {
            error!(
                rule = rule.id,
                target = %sink.target(),
                error = %e,
                "error writing to log"
            );
        }
    }

    if let Some(report) = &rule.report {
        if let Err(e) = run_report(&run, report, &ctx, &settings, &output).await {
            warn!(rule = rule.id, error = ?e, "report command failed");
        }
    }

    outcome
}

/// Spawn a configured command, attaching an output pipe if stdio is piped.
fn spawn(mut cmd: Command) -> Result<(Child, Option<OutputPipe>)> {
    let mut child = cmd.spawn().context("spawning process")?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let pipe = (stdout.is_some() || stderr.is_some()).then(|| OutputPipe::spawn(stdout, stderr));

    Ok((child, pipe))
}

/// Wait for the child; `Ok(None)` means it hit `timeout` and was killed.
async fn wait_for_exit(child: &mut Child, timeout: Option<Duration>) -> Result<Option<ExitStatus>> {
    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        status = child.wait() => {
            Ok(Some(status.context("waiting for process")?))
        }
        _ = deadline => {
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill timed-out process");
            }
            Ok(None)
        }
    }
}

/// Run the report command with the captured output in `<prefix>output`.
async fn run_report(
    run: &ScheduledRun,
    script: &str,
    ctx: &ExecutionContext,
    settings: &ExecSettings,
    output: &CapturedOutput,
) -> Result<()> {
    let rule = &run.rule;
    let mut env = ctx.env.clone();
    env.insert(output_var(&settings.env_prefix), env_value(&output.combined()));

    let mut cmd = shell_command(script);
    configure(&mut cmd, &env, true);

    info!(rule = rule.id, report = %script, "starting report command");

    let (mut child, pipe) =
        spawn(cmd).with_context(|| format!("spawning report command [{script}]"))?;
    let status = wait_for_exit(&mut child, rule.timeout).await?;

    let report_output = match pipe {
        Some(pipe) if status.is_none() => pipe.finish_within(KILL_GRACE).await,
        Some(pipe) => pipe.finish().await,
        None => CapturedOutput::default(),
    };
    for line in report_output.lines() {
        debug!(rule = rule.id, "report: {}", line.render());
    }

    match status {
        Some(status) => {
            info!(
                rule = rule.id,
                exit_code = status.code().unwrap_or(-1),
                success = status.success(),
                "report command exited"
            );
            Ok(())
        }
        None => Err(anyhow::anyhow!("report command timed out and was killed")),
    }
}
