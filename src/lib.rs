// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod env;
pub mod errors;
pub mod exec;
pub mod ingress;
pub mod logging;
pub mod predicate;
pub mod types;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::{Notify, mpsc};
use tracing::{debug, error, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, compile_rules};
use crate::env::BaseEnv;
use crate::exec::{ExecSettings, LogSink, RealExecutorBackend};
use crate::ingress::IngressConfig;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file + flags)
/// - the listener
/// - runtime / executor / ingress
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(args.config.as_deref(), args.overrides())?;

    if args.dry_run {
        print_dry_run(&cfg)?;
        return Ok(());
    }

    if cfg.secret.is_none() {
        warn!("no secret configured; webhook signatures will not be verified");
    }

    // Snapshot once: every run starts from the environment hookrun was started in.
    let base_env = BaseEnv::capture();

    let addr = cfg.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    serve(&cfg, base_env, listener, shutdown_signal()).await?;

    info!("hookrun stopped");
    Ok(())
}

/// Run the whole service on an already bound listener.
///
/// When `shutdown` resolves the endpoint stops accepting requests, running
/// rules (and their pending re-runs) finish, and the final core state is
/// returned.
pub async fn serve<F>(
    cfg: &ConfigFile,
    base_env: BaseEnv,
    listener: TcpListener,
    shutdown: F,
) -> Result<CoreRuntime>
where
    F: Future<Output = ()> + Send + 'static,
{
    let rules = compile_rules(&cfg.rules)?;
    if rules.is_empty() {
        warn!("no rules configured; events will be accepted and ignored");
    }
    for rule in &rules {
        debug!(rule = rule.id, "loaded rule {}", rule);
    }

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    // Process executor backend (real implementation in production).
    let settings = ExecSettings {
        base_env: Arc::new(base_env),
        env_prefix: cfg.env_prefix.clone(),
        log_sink: cfg.log.clone().map(|target| Arc::new(LogSink::new(target))),
    };
    let executor = RealExecutorBackend::new(rt_tx.clone(), settings);

    let stop_http = Arc::new(Notify::new());

    // Shutdown trigger → stop accepting requests, then drain.
    {
        let tx = rt_tx.clone();
        let stop_http = Arc::clone(&stop_http);
        tokio::spawn(async move {
            shutdown.await;
            info!("shutdown requested; waiting for running rules");
            stop_http.notify_one();
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    // HTTP ingress.
    let server = {
        let ingress = IngressConfig {
            path: cfg.path.clone(),
            secret: cfg.secret.clone(),
        };
        let tx = rt_tx.clone();
        let stop = Arc::clone(&stop_http);
        tokio::spawn(async move {
            let stopped = async move { stop.notified().await };
            if let Err(e) = ingress::serve(listener, ingress, tx.clone(), stopped).await {
                error!(error = %e, "webhook server failed");
                let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
            }
        })
    };

    drop(rt_tx);

    // Construct the pure core runtime (single source of truth for semantics)
    // and the async IO shell around it.
    let runtime = Runtime::new(CoreRuntime::new(rules), rt_rx, executor);
    let core = runtime.run().await?;

    stop_http.notify_one();
    if let Err(e) = server.await {
        warn!(error = %e, "webhook server task failed");
    }

    Ok(core)
}

/// Resolves on the first Ctrl-C. A second Ctrl-C exits immediately.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }

    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("second Ctrl+C; exiting without waiting for running rules");
            std::process::exit(130);
        }
    });
}

/// Dry-run output: effective settings and compiled rules.
fn print_dry_run(cfg: &ConfigFile) -> Result<()> {
    let rules = compile_rules(&cfg.rules)?;

    println!("hookrun dry-run");
    println!("  listen = {}", cfg.bind_addr());
    println!("  path = {}", cfg.path);
    println!(
        "  secret = {}",
        if cfg.secret.is_some() { "(set)" } else { "(none)" }
    );
    match &cfg.log {
        Some(target) => println!("  log = {target}"),
        None => println!("  log = (none)"),
    }
    println!("  env_prefix = {}", cfg.env_prefix);
    println!();

    println!("rules ({}):", rules.len());
    for rule in &rules {
        println!("  - [{}] {}", rule.id, rule);
        if let Some(report) = &rule.report {
            println!("      report: {report}");
        }
        if let Some(timeout) = rule.timeout {
            println!("      timeout: {timeout:?}");
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
