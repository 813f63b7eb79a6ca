//! Every job gets exactly one terminal report, whatever its handler does.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use conduit_engine::{
  DeploymentResult, EngineError, InstanceResult, Job, JobKey, JobStream, LocalEngine, Variables,
  WorkflowEngineClient,
};
use conduit_worker::{JobError, JobHandler, WorkerRegistry};
use serde_json::json;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Report {
  Completed,
  Failed,
}

/// Delegates to a `LocalEngine` and records every terminal call per job.
struct RecordingEngine {
  inner: LocalEngine,
  reports: Mutex<HashMap<JobKey, Vec<Report>>>,
}

impl RecordingEngine {
  fn new(inner: LocalEngine) -> Self {
    Self {
      inner,
      reports: Mutex::new(HashMap::new()),
    }
  }

  async fn reports(&self) -> HashMap<JobKey, Vec<Report>> {
    self.reports.lock().await.clone()
  }
}

#[async_trait]
impl WorkflowEngineClient for RecordingEngine {
  async fn deploy_resource(&self, artifact_path: &Path) -> Result<DeploymentResult, EngineError> {
    self.inner.deploy_resource(artifact_path).await
  }

  async fn create_instance_and_await_result(
    &self,
    process_id: &str,
    variables: Variables,
  ) -> Result<InstanceResult, EngineError> {
    self
      .inner
      .create_instance_and_await_result(process_id, variables)
      .await
  }

  async fn subscribe(&self, task_type: &str) -> Result<JobStream, EngineError> {
    self.inner.subscribe(task_type).await
  }

  async fn release(&self, stream: JobStream) {
    self.inner.release(stream).await
  }

  async fn complete_job(&self, job_key: JobKey, variables: Variables) -> Result<(), EngineError> {
    self
      .reports
      .lock()
      .await
      .entry(job_key)
      .or_default()
      .push(Report::Completed);
    self.inner.complete_job(job_key, variables).await
  }

  async fn fail_job(
    &self,
    job_key: JobKey,
    payload: serde_json::Value,
  ) -> Result<(), EngineError> {
    self
      .reports
      .lock()
      .await
      .entry(job_key)
      .or_default()
      .push(Report::Failed);
    self.inner.fail_job(job_key, payload).await
  }
}

/// Succeeds, fails or panics depending on the job's `mode` variable.
struct ModeHandler;

#[async_trait]
impl JobHandler for ModeHandler {
  async fn handle(&self, job: &Job) -> Result<Variables, JobError> {
    match job.str_var("mode") {
      Some("err") => Err(JobError::Other("rejected".to_string())),
      Some("panic") => panic!("handler bug"),
      _ => Ok(Variables::new()),
    }
  }
}

async fn run_mode(engine: &LocalEngine, mode: &str) -> Result<InstanceResult, EngineError> {
  engine
    .create_instance_and_await_result(
      "p",
      json!({ "mode": mode }).as_object().cloned().unwrap(),
    )
    .await
}

#[tokio::test]
async fn test_each_job_is_reported_once() {
  let local = LocalEngine::new();
  let mut artifact = tempfile::NamedTempFile::new().unwrap();
  artifact
    .write_all(br#"{ "process_id": "p", "tasks": [{ "task_type": "t" }] }"#)
    .unwrap();
  local.deploy_resource(artifact.path()).await.unwrap();

  let engine = Arc::new(RecordingEngine::new(local.clone()));
  let registry = WorkerRegistry::new(engine.clone());
  registry.register("t", Arc::new(ModeHandler)).await.unwrap();

  assert!(run_mode(&local, "ok").await.is_ok());
  assert!(matches!(
    run_mode(&local, "err").await,
    Err(EngineError::ProcessFailed { .. })
  ));
  assert!(matches!(
    run_mode(&local, "panic").await,
    Err(EngineError::ProcessFailed { .. })
  ));

  // Wait for in-flight jobs before counting.
  registry.shutdown().await;

  let reports = engine.reports().await;
  assert_eq!(reports.len(), 3);
  assert!(reports.values().all(|r| r.len() == 1), "{reports:?}");

  let mut outcomes: Vec<Report> = reports.values().map(|r| r[0]).collect();
  outcomes.sort_by_key(|r| *r == Report::Failed);
  assert_eq!(
    outcomes,
    vec![Report::Completed, Report::Failed, Report::Failed]
  );
  assert_eq!(local.active_job_count().await, 0);
}
