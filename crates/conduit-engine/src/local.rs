//! In-process workflow engine.
//!
//! [`LocalEngine`] keeps deployments, job queues and active jobs in memory.
//! Each instance is driven by its own spawned task, so an instance keeps
//! running engine-side even when the caller that created it stops waiting.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, error, info, instrument, warn};

use crate::artifact::{ProcessArtifact, TaskDef};
use crate::client::{JobStream, WorkflowEngineClient};
use crate::error::EngineError;
use crate::events::{InstanceEvent, InstanceNotifier, NoopNotifier};
use crate::types::{
  DeploymentResult, InstanceKey, InstanceResult, Job, JobKey, Variables, WorkflowDefinition,
};

/// Terminal outcome reported for a job.
enum JobOutcome {
  Completed(Variables),
  Failed(serde_json::Value),
}

struct Deployed {
  definition: WorkflowDefinition,
  artifact: ProcessArtifact,
}

/// Queue of jobs for one task type. The receiver is absent while a worker
/// holds it.
struct TaskQueue {
  sender: mpsc::UnboundedSender<Job>,
  receiver: Option<mpsc::UnboundedReceiver<Job>>,
}

impl TaskQueue {
  fn new() -> Self {
    let (sender, receiver) = mpsc::unbounded_channel();
    Self {
      sender,
      receiver: Some(receiver),
    }
  }
}

struct ActiveJob {
  instance_key: InstanceKey,
  outcome: oneshot::Sender<JobOutcome>,
}

struct EngineState {
  deployments: Mutex<HashMap<String, Vec<Deployed>>>,
  queues: Mutex<HashMap<String, TaskQueue>>,
  active_jobs: Mutex<HashMap<JobKey, ActiveJob>>,
  next_key: AtomicU64,
  notifier: Arc<dyn InstanceNotifier>,
}

/// A workflow engine that runs inside the current process.
#[derive(Clone)]
pub struct LocalEngine {
  state: Arc<EngineState>,
}

impl Default for LocalEngine {
  fn default() -> Self {
    Self::new()
  }
}

impl LocalEngine {
  /// Create an engine that discards instance events.
  pub fn new() -> Self {
    Self::with_notifier(Arc::new(NoopNotifier))
  }

  /// Create an engine that reports instance events to `notifier`.
  pub fn with_notifier(notifier: Arc<dyn InstanceNotifier>) -> Self {
    Self {
      state: Arc::new(EngineState {
        deployments: Mutex::new(HashMap::new()),
        queues: Mutex::new(HashMap::new()),
        active_jobs: Mutex::new(HashMap::new()),
        next_key: AtomicU64::new(1),
        notifier,
      }),
    }
  }

  /// All deployed versions of a process, oldest first.
  pub async fn deployed_versions(&self, process_id: &str) -> Vec<WorkflowDefinition> {
    self
      .state
      .deployments
      .lock()
      .await
      .get(process_id)
      .map(|versions| versions.iter().map(|d| d.definition.clone()).collect())
      .unwrap_or_default()
  }

  /// Number of jobs created but not yet completed or failed.
  pub async fn active_job_count(&self) -> usize {
    self.state.active_jobs.lock().await.len()
  }

  fn next_key(&self) -> u64 {
    self.state.next_key.fetch_add(1, Ordering::Relaxed)
  }

  fn notify(&self, event: InstanceEvent) {
    self.state.notifier.notify(event);
  }

  async fn enqueue(&self, job: Job) {
    let mut queues = self.state.queues.lock().await;
    let queue = queues
      .entry(job.task_type.clone())
      .or_insert_with(TaskQueue::new);

    if let Err(mpsc::error::SendError(job)) = queue.sender.send(job) {
      // The subscriber dropped its stream without releasing it. Start a fresh
      // queue so the job waits for the next subscriber.
      warn!(task_type = %job.task_type, "job stream was dropped, recreating queue");
      let fresh = TaskQueue::new();
      let _ = fresh.sender.send(job);
      *queue = fresh;
    }
  }

  /// Walk the tasks of an instance, blocking on each job's outcome.
  async fn drive(
    self,
    instance_key: InstanceKey,
    process_id: String,
    version: u32,
    tasks: Vec<TaskDef>,
    mut variables: Variables,
  ) -> Result<InstanceResult, EngineError> {
    for task in tasks {
      let job_key = JobKey(self.next_key());
      let (outcome_tx, outcome_rx) = oneshot::channel();

      self.state.active_jobs.lock().await.insert(
        job_key,
        ActiveJob {
          instance_key,
          outcome: outcome_tx,
        },
      );

      self.notify(InstanceEvent::JobCreated {
        instance_key,
        job_key,
        task_type: task.task_type.clone(),
      });
      debug!(
        instance_key = %instance_key,
        job_key = %job_key,
        task_type = %task.task_type,
        "job created"
      );

      self
        .enqueue(Job {
          job_key,
          task_type: task.task_type,
          instance_key,
          process_id: process_id.clone(),
          variables: variables.clone(),
        })
        .await;

      match outcome_rx.await {
        Ok(JobOutcome::Completed(result)) => {
          self.notify(InstanceEvent::JobCompleted {
            instance_key,
            job_key,
            variables: result.clone(),
          });
          variables.extend(result);
        }
        Ok(JobOutcome::Failed(payload)) => {
          self.notify(InstanceEvent::JobFailed {
            instance_key,
            job_key,
            payload: payload.clone(),
          });
          self.notify(InstanceEvent::InstanceFailed {
            instance_key,
            payload: payload.clone(),
          });
          error!(instance_key = %instance_key, payload = %payload, "instance failed");
          return Err(EngineError::ProcessFailed {
            instance_key,
            payload,
          });
        }
        Err(_) => return Err(EngineError::InstanceAbandoned { instance_key }),
      }
    }

    self.notify(InstanceEvent::InstanceCompleted {
      instance_key,
      variables: variables.clone(),
    });
    info!(instance_key = %instance_key, process_id = %process_id, "instance completed");

    Ok(InstanceResult {
      instance_key,
      process_id,
      version,
      variables,
    })
  }

  async fn finish_job(&self, job_key: JobKey, outcome: JobOutcome) -> Result<(), EngineError> {
    let job = self
      .state
      .active_jobs
      .lock()
      .await
      .remove(&job_key)
      .ok_or(EngineError::JobNotActive { job_key })?;

    if job.outcome.send(outcome).is_err() {
      warn!(
        job_key = %job_key,
        instance_key = %job.instance_key,
        "instance is no longer waiting for job"
      );
    }
    Ok(())
  }
}

#[async_trait]
impl WorkflowEngineClient for LocalEngine {
  #[instrument(
    name = "engine_deploy",
    skip(self),
    fields(artifact = %artifact_path.display())
  )]
  async fn deploy_resource(&self, artifact_path: &Path) -> Result<DeploymentResult, EngineError> {
    let content = tokio::fs::read_to_string(artifact_path)
      .await
      .map_err(|source| EngineError::ArtifactRead {
        path: artifact_path.to_path_buf(),
        source,
      })?;

    let artifact =
      ProcessArtifact::from_json(&content).map_err(|message| EngineError::InvalidArtifact {
        path: artifact_path.to_path_buf(),
        message,
      })?;

    let mut deployments = self.state.deployments.lock().await;
    let versions = deployments.entry(artifact.process_id.clone()).or_default();

    if let Some(latest) = versions.last()
      && latest.artifact == artifact
    {
      info!(
        process_id = %latest.definition.process_id,
        version = latest.definition.version,
        "deployment unchanged"
      );
      return Ok(DeploymentResult {
        definition: latest.definition.clone(),
        duplicate: true,
      });
    }

    let definition = WorkflowDefinition {
      process_id: artifact.process_id.clone(),
      source_artifact_path: artifact_path.to_path_buf(),
      version: versions.len() as u32 + 1,
      deployed_at: Utc::now(),
    };
    versions.push(Deployed {
      definition: definition.clone(),
      artifact,
    });

    info!(
      process_id = %definition.process_id,
      version = definition.version,
      "process deployed"
    );

    Ok(DeploymentResult {
      definition,
      duplicate: false,
    })
  }

  #[instrument(name = "engine_create_instance", skip(self, variables))]
  async fn create_instance_and_await_result(
    &self,
    process_id: &str,
    variables: Variables,
  ) -> Result<InstanceResult, EngineError> {
    let (version, tasks) = {
      let deployments = self.state.deployments.lock().await;
      let latest = deployments
        .get(process_id)
        .and_then(|versions| versions.last())
        .ok_or_else(|| EngineError::ProcessNotFound {
          process_id: process_id.to_string(),
        })?;
      (latest.definition.version, latest.artifact.tasks.clone())
    };

    let instance_key = InstanceKey(self.next_key());
    self.notify(InstanceEvent::InstanceCreated {
      instance_key,
      process_id: process_id.to_string(),
      version,
      variables: variables.clone(),
    });
    info!(instance_key = %instance_key, version, "instance created");

    let driver = self
      .clone()
      .drive(instance_key, process_id.to_string(), version, tasks, variables);

    // Detached: dropping the caller's future leaves the instance running.
    match tokio::spawn(driver).await {
      Ok(result) => result,
      Err(e) => {
        error!(instance_key = %instance_key, error = %e, "instance driver panicked");
        Err(EngineError::InstanceAbandoned { instance_key })
      }
    }
  }

  async fn subscribe(&self, task_type: &str) -> Result<JobStream, EngineError> {
    let mut queues = self.state.queues.lock().await;
    let queue = queues
      .entry(task_type.to_string())
      .or_insert_with(TaskQueue::new);

    match queue.receiver.take() {
      Some(receiver) => {
        debug!(task_type = %task_type, "job stream subscribed");
        Ok(JobStream::new(task_type, receiver))
      }
      None => Err(EngineError::AlreadySubscribed {
        task_type: task_type.to_string(),
      }),
    }
  }

  async fn release(&self, stream: JobStream) {
    let (task_type, receiver) = stream.into_parts();
    let mut queues = self.state.queues.lock().await;
    let queue = queues.entry(task_type.clone()).or_insert_with(TaskQueue::new);

    if queue.receiver.is_none() {
      queue.receiver = Some(receiver);
      debug!(task_type = %task_type, "job stream released");
    }
  }

  async fn complete_job(&self, job_key: JobKey, variables: Variables) -> Result<(), EngineError> {
    self.finish_job(job_key, JobOutcome::Completed(variables)).await
  }

  async fn fail_job(
    &self,
    job_key: JobKey,
    payload: serde_json::Value,
  ) -> Result<(), EngineError> {
    self.finish_job(job_key, JobOutcome::Failed(payload)).await
  }
}
