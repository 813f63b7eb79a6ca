//! Integration tests for LocalEngine: deployment, job delivery and outcomes.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use conduit_engine::{
  ChannelNotifier, EngineError, InstanceEvent, LocalEngine, Variables, WorkflowEngineClient,
};
use serde_json::json;
use tokio::sync::mpsc;

const TWO_TASKS: &str = r#"{
  "process_id": "weather",
  "tasks": [{ "task_type": "lookup" }, { "task_type": "report" }]
}"#;

fn write_artifact(json: &str) -> tempfile::NamedTempFile {
  let mut file = tempfile::NamedTempFile::new().expect("failed to create temp file");
  file
    .write_all(json.as_bytes())
    .expect("failed to write artifact");
  file
}

fn vars(value: serde_json::Value) -> Variables {
  value.as_object().cloned().expect("expected a JSON object")
}

#[tokio::test]
async fn test_redeploying_unchanged_artifact_is_noop() {
  let engine = LocalEngine::new();
  let artifact = write_artifact(TWO_TASKS);

  let first = engine.deploy_resource(artifact.path()).await.unwrap();
  let second = engine.deploy_resource(artifact.path()).await.unwrap();

  assert!(!first.duplicate);
  assert!(second.duplicate);
  assert_eq!(first.definition, second.definition);

  let versions = engine.deployed_versions("weather").await;
  assert_eq!(versions.len(), 1);
  assert_eq!(versions[0].version, 1);
}

#[tokio::test]
async fn test_invalid_artifact_leaves_deployments_untouched() {
  let engine = LocalEngine::new();
  let good = write_artifact(TWO_TASKS);
  let bad = write_artifact(r#"{ "process_id": "weather", "tasks": [] }"#);

  engine.deploy_resource(good.path()).await.unwrap();
  let err = engine.deploy_resource(bad.path()).await.unwrap_err();

  assert!(matches!(err, EngineError::InvalidArtifact { .. }));
  assert_eq!(engine.deployed_versions("weather").await.len(), 1);
}

#[tokio::test]
async fn test_missing_artifact_file() {
  let engine = LocalEngine::new();
  let err = engine
    .deploy_resource(std::path::Path::new("/nonexistent/process.json"))
    .await
    .unwrap_err();
  assert!(matches!(err, EngineError::ArtifactRead { .. }));
}

#[tokio::test]
async fn test_run_unknown_process() {
  let engine = LocalEngine::new();
  let err = engine
    .create_instance_and_await_result("missing", Variables::new())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    EngineError::ProcessNotFound { ref process_id } if process_id == "missing"
  ));
}

#[tokio::test]
async fn test_jobs_merge_variables_in_order() {
  let engine = LocalEngine::new();
  let artifact = write_artifact(TWO_TASKS);
  engine.deploy_resource(artifact.path()).await.unwrap();

  let mut lookup = engine.subscribe("lookup").await.unwrap();
  let mut report = engine.subscribe("report").await.unwrap();

  let worker_engine = engine.clone();
  let worker = tokio::spawn(async move {
    let job = lookup.next().await.unwrap();
    assert_eq!(job.str_var("city"), Some("Seattle"));
    worker_engine
      .complete_job(job.job_key, vars(json!({"temperature": 60})))
      .await
      .unwrap();

    let job = report.next().await.unwrap();
    // The second job sees the output of the first
    assert_eq!(job.variables["temperature"], json!(60));
    worker_engine
      .complete_job(job.job_key, vars(json!({"serviceTaskOutcome": "done"})))
      .await
      .unwrap();
  });

  let result = engine
    .create_instance_and_await_result("weather", vars(json!({"city": "Seattle"})))
    .await
    .unwrap();
  worker.await.unwrap();

  assert_eq!(result.process_id, "weather");
  assert_eq!(result.variables["city"], json!("Seattle"));
  assert_eq!(result.variables["temperature"], json!(60));
  assert_eq!(result.variables["serviceTaskOutcome"], json!("done"));
  assert_eq!(engine.active_job_count().await, 0);
}

#[tokio::test]
async fn test_failed_job_fails_instance_with_payload() {
  let engine = LocalEngine::new();
  let artifact = write_artifact(TWO_TASKS);
  engine.deploy_resource(artifact.path()).await.unwrap();

  let mut lookup = engine.subscribe("lookup").await.unwrap();
  let worker_engine = engine.clone();
  tokio::spawn(async move {
    let job = lookup.next().await.unwrap();
    worker_engine
      .fail_job(job.job_key, json!({"message": "upstream down"}))
      .await
      .unwrap();
  });

  let err = engine
    .create_instance_and_await_result("weather", Variables::new())
    .await
    .unwrap_err();

  match err {
    EngineError::ProcessFailed { payload, .. } => {
      assert_eq!(payload["message"], "upstream down");
    }
    other => panic!("expected ProcessFailed, got {other:?}"),
  }
}

#[tokio::test]
async fn test_second_terminal_call_is_rejected() {
  let engine = LocalEngine::new();
  let artifact = write_artifact(r#"{ "process_id": "p", "tasks": [{ "task_type": "t" }] }"#);
  engine.deploy_resource(artifact.path()).await.unwrap();

  let mut stream = engine.subscribe("t").await.unwrap();
  let run_engine = engine.clone();
  let run = tokio::spawn(async move {
    run_engine
      .create_instance_and_await_result("p", Variables::new())
      .await
  });

  let job = stream.next().await.unwrap();
  engine.complete_job(job.job_key, Variables::new()).await.unwrap();

  let again = engine.complete_job(job.job_key, Variables::new()).await;
  assert!(matches!(again, Err(EngineError::JobNotActive { job_key }) if job_key == job.job_key));
  let fail = engine.fail_job(job.job_key, json!({})).await;
  assert!(matches!(fail, Err(EngineError::JobNotActive { .. })));

  assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_job_waits_for_late_subscriber() {
  let engine = LocalEngine::new();
  let artifact = write_artifact(r#"{ "process_id": "p", "tasks": [{ "task_type": "t" }] }"#);
  engine.deploy_resource(artifact.path()).await.unwrap();

  let run_engine = engine.clone();
  let run = tokio::spawn(async move {
    run_engine
      .create_instance_and_await_result("p", Variables::new())
      .await
  });

  // Nobody is subscribed: the instance cannot progress.
  tokio::time::sleep(Duration::from_millis(20)).await;
  assert!(!run.is_finished());
  assert_eq!(engine.active_job_count().await, 1);

  let mut stream = engine.subscribe("t").await.unwrap();
  let job = stream.next().await.unwrap();
  engine.complete_job(job.job_key, Variables::new()).await.unwrap();

  assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_single_subscription_per_task_type() {
  let engine = LocalEngine::new();

  let stream = engine.subscribe("t").await.unwrap();
  let err = engine.subscribe("t").await.unwrap_err();
  assert!(matches!(err, EngineError::AlreadySubscribed { ref task_type } if task_type == "t"));

  engine.release(stream).await;
  assert!(engine.subscribe("t").await.is_ok());
}

#[tokio::test]
async fn test_events_follow_instance_lifecycle() {
  let (tx, mut rx) = mpsc::unbounded_channel();
  let engine = LocalEngine::with_notifier(Arc::new(ChannelNotifier::new(tx)));
  let artifact = write_artifact(r#"{ "process_id": "p", "tasks": [{ "task_type": "t" }] }"#);
  engine.deploy_resource(artifact.path()).await.unwrap();

  let mut stream = engine.subscribe("t").await.unwrap();
  let worker_engine = engine.clone();
  tokio::spawn(async move {
    let job = stream.next().await.unwrap();
    worker_engine
      .complete_job(job.job_key, vars(json!({"out": 1})))
      .await
      .unwrap();
  });

  let result = engine
    .create_instance_and_await_result("p", Variables::new())
    .await
    .unwrap();

  let mut events = Vec::new();
  while let Ok(event) = rx.try_recv() {
    events.push(event);
  }

  assert_eq!(events.len(), 4);
  assert!(matches!(events[0], InstanceEvent::InstanceCreated { .. }));
  assert!(matches!(events[1], InstanceEvent::JobCreated { .. }));
  assert!(matches!(events[2], InstanceEvent::JobCompleted { .. }));
  match &events[3] {
    InstanceEvent::InstanceCompleted { variables, .. } => {
      assert_eq!(variables["out"], json!(1));
    }
    other => panic!("expected InstanceCompleted, got {other:?}"),
  }
  assert!(events.iter().all(|e| e.instance_key() == result.instance_key));
}
