// tests/runtime_fake_executor.rs

mod common;
use crate::common::{ConfigFileBuilder, RuleBuilder, event, init_tracing, with_timeout};

use std::error::Error;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::mpsc;

use hookrun::engine::{
    CoreRuntime, RuleRunState, RunOutcome, Runtime, RuntimeEvent, compile_rules,
};
use hookrun_test_utils::fake_executor::{FakeExecutor, RecordedRun};

type TestResult = Result<(), Box<dyn Error>>;

fn recorded(rule: usize, delivery: &str) -> RecordedRun {
    RecordedRun {
        rule,
        delivery_id: delivery.to_string(),
    }
}

fn received(event_type: &str, delivery: &str, payload: serde_json::Value) -> RuntimeEvent {
    RuntimeEvent::EventReceived(Arc::new(event(event_type, delivery, payload)))
}

fn completed(rule: usize) -> RuntimeEvent {
    RuntimeEvent::RunCompleted {
        rule,
        outcome: RunOutcome::Exited(0),
    }
}

fn core_for(rules: Vec<hookrun::config::RuleConfig>) -> CoreRuntime {
    let mut builder = ConfigFileBuilder::new();
    for rule in rules {
        builder = builder.with_rule(rule);
    }
    let cfg = builder.build();
    CoreRuntime::new(compile_rules(&cfg.rules).unwrap())
}

#[tokio::test]
async fn events_dispatch_to_matching_rules_in_order() -> TestResult {
    init_tracing();

    let core = core_for(vec![
        RuleBuilder::new("push", "ref == refs/heads/main", "deploy.sh").build(),
        RuleBuilder::new("issues", "action == opened", "triage.sh").build(),
        RuleBuilder::new("*", "action == opened", "notify.sh").build(),
    ]);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone());

    rt_tx
        .send(received("push", "d1", json!({ "ref": "refs/heads/main" })))
        .await?;
    rt_tx
        .send(received("push", "d2", json!({ "ref": "refs/heads/dev" })))
        .await?;
    rt_tx
        .send(received("issues", "d3", json!({ "action": "opened" })))
        .await?;
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;

    let core = with_timeout(Runtime::new(core, rt_rx, executor).run()).await?;

    assert!(core.is_idle());
    assert_eq!(
        *executed.lock().unwrap(),
        vec![recorded(0, "d1"), recorded(1, "d3"), recorded(2, "d3")]
    );
    Ok(())
}

#[tokio::test]
async fn triggers_while_running_coalesce_into_one_rerun() -> TestResult {
    init_tracing();

    let core = core_for(vec![RuleBuilder::new("push", "ref", "build.sh").build()]);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::manual(rt_tx.clone(), executed.clone());

    for id in ["d1", "d2", "d3", "d4"] {
        rt_tx.send(received("push", id, json!({ "ref": "x" }))).await?;
    }
    // First run ends, the single re-run starts and ends.
    rt_tx.send(completed(0)).await?;
    rt_tx.send(completed(0)).await?;
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;

    let core = with_timeout(Runtime::new(core, rt_rx, executor).run()).await?;

    assert_eq!(core.state_of(0), Some(RuleRunState::Idle));
    // The re-run replays the event that started the first run.
    assert_eq!(
        *executed.lock().unwrap(),
        vec![recorded(0, "d1"), recorded(0, "d1")]
    );
    Ok(())
}

#[tokio::test]
async fn shutdown_refuses_new_events_but_finishes_pending_rerun() -> TestResult {
    init_tracing();

    let core = core_for(vec![RuleBuilder::new("push", "ref", "build.sh").build()]);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::manual(rt_tx.clone(), executed.clone());

    rt_tx.send(received("push", "d1", json!({ "ref": "x" }))).await?;
    rt_tx.send(received("push", "d2", json!({ "ref": "x" }))).await?;
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;
    rt_tx.send(received("push", "d3", json!({ "ref": "x" }))).await?;
    rt_tx.send(completed(0)).await?;
    rt_tx.send(completed(0)).await?;

    let core = with_timeout(Runtime::new(core, rt_rx, executor).run()).await?;

    assert!(core.is_idle());
    assert_eq!(
        *executed.lock().unwrap(),
        vec![recorded(0, "d1"), recorded(0, "d1")]
    );
    Ok(())
}

#[tokio::test]
async fn rule_with_bad_expression_never_fires() -> TestResult {
    init_tracing();

    let core = core_for(vec![
        RuleBuilder::new("push", "ref == (", "broken.sh").build(),
        RuleBuilder::new("push", "ref", "ok.sh").build(),
    ]);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone());

    rt_tx.send(received("push", "d1", json!({ "ref": "x" }))).await?;
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;

    with_timeout(Runtime::new(core, rt_rx, executor).run()).await?;

    assert_eq!(*executed.lock().unwrap(), vec![recorded(1, "d1")]);
    Ok(())
}
