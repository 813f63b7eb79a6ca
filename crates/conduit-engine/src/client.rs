//! The engine contract.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::EngineError;
use crate::types::{DeploymentResult, InstanceResult, Job, JobKey, Variables};

/// Jobs of one task type, delivered to the single worker that subscribed.
#[derive(Debug)]
pub struct JobStream {
  task_type: String,
  receiver: mpsc::UnboundedReceiver<Job>,
}

impl JobStream {
  pub fn new(task_type: impl Into<String>, receiver: mpsc::UnboundedReceiver<Job>) -> Self {
    Self {
      task_type: task_type.into(),
      receiver,
    }
  }

  pub fn task_type(&self) -> &str {
    &self.task_type
  }

  /// Wait for the next job. `None` once the engine is gone.
  pub async fn next(&mut self) -> Option<Job> {
    self.receiver.recv().await
  }

  pub(crate) fn into_parts(self) -> (String, mpsc::UnboundedReceiver<Job>) {
    (self.task_type, self.receiver)
  }
}

/// Operations Conduit needs from a workflow engine.
///
/// Implementations are shared across commands behind an `Arc` and must be
/// safe to call concurrently.
#[async_trait]
pub trait WorkflowEngineClient: Send + Sync {
  /// Upload a process artifact. Deploying an unchanged artifact is a no-op
  /// that returns the active version.
  async fn deploy_resource(&self, artifact_path: &Path) -> Result<DeploymentResult, EngineError>;

  /// Create an instance of the latest version of `process_id` and wait until
  /// it reaches a terminal state.
  ///
  /// This can wait forever when no worker claims one of its jobs; callers
  /// must bound it with their own deadline.
  async fn create_instance_and_await_result(
    &self,
    process_id: &str,
    variables: Variables,
  ) -> Result<InstanceResult, EngineError>;

  /// Take the job stream for a task type. Jobs created before the call are
  /// delivered too.
  async fn subscribe(&self, task_type: &str) -> Result<JobStream, EngineError>;

  /// Hand a job stream back so another subscriber can take it. Jobs still
  /// buffered in the stream stay queued.
  async fn release(&self, stream: JobStream);

  /// Report a job as completed, merging `variables` into its instance.
  async fn complete_job(&self, job_key: JobKey, variables: Variables) -> Result<(), EngineError>;

  /// Report a job as failed. The instance fails with `payload` as diagnostic.
  async fn fail_job(&self, job_key: JobKey, payload: serde_json::Value)
  -> Result<(), EngineError>;
}
