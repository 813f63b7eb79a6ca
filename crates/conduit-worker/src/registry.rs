//! Process-wide worker registry.

use std::collections::HashMap;
use std::sync::Arc;

use conduit_engine::{Job, JobStream, WorkflowEngineClient};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, warn};

use crate::error::WorkerError;
use crate::handler::JobHandler;

/// Outcome of [`WorkerRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
  /// A new subscription was created.
  Registered,
  /// The task type already had a subscription; the handler was not used.
  AlreadyRegistered,
}

/// Snapshot of one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
  pub task_type: String,
  /// `false` once the worker loop has exited (engine went away).
  pub active: bool,
}

struct Subscription {
  cancel: CancellationToken,
  handle: JoinHandle<()>,
}

/// Owns every worker subscription in the process.
///
/// Create one at startup, register each task type once, and keep it for the
/// lifetime of the process. Registering a task type again is a no-op, so the
/// number of subscriptions never exceeds the number of distinct task types.
pub struct WorkerRegistry {
  engine: Arc<dyn WorkflowEngineClient>,
  subscriptions: Mutex<HashMap<String, Subscription>>,
  cancel: CancellationToken,
  jobs: TaskTracker,
}

impl WorkerRegistry {
  pub fn new(engine: Arc<dyn WorkflowEngineClient>) -> Self {
    Self {
      engine,
      subscriptions: Mutex::new(HashMap::new()),
      cancel: CancellationToken::new(),
      jobs: TaskTracker::new(),
    }
  }

  /// Bind `handler` to `task_type` unless the task type is already bound.
  #[instrument(name = "worker_register", skip(self, handler))]
  pub async fn register(
    &self,
    task_type: &str,
    handler: Arc<dyn JobHandler>,
  ) -> Result<Registration, WorkerError> {
    if self.cancel.is_cancelled() {
      return Err(WorkerError::ShutDown);
    }

    // Held across the subscribe call so concurrent registrations of the same
    // task type cannot both subscribe.
    let mut subscriptions = self.subscriptions.lock().await;
    if subscriptions.contains_key(task_type) {
      debug!("task type already registered");
      return Ok(Registration::AlreadyRegistered);
    }

    let stream = self
      .engine
      .subscribe(task_type)
      .await
      .map_err(|source| WorkerError::Subscribe {
        task_type: task_type.to_string(),
        source,
      })?;

    let cancel = self.cancel.child_token();
    let handle = tokio::spawn(run_worker(
      self.engine.clone(),
      stream,
      handler,
      cancel.clone(),
      self.jobs.clone(),
    ));

    subscriptions.insert(task_type.to_string(), Subscription { cancel, handle });
    info!("worker registered");

    Ok(Registration::Registered)
  }

  /// Stop the worker for `task_type`. Unclaimed jobs stay queued in the
  /// engine. Returns `false` if the task type was not registered.
  pub async fn deregister(&self, task_type: &str) -> bool {
    let subscription = self.subscriptions.lock().await.remove(task_type);

    match subscription {
      Some(subscription) => {
        subscription.cancel.cancel();
        if let Err(e) = subscription.handle.await {
          error!(task_type = %task_type, error = %e, "worker loop panicked");
        }
        info!(task_type = %task_type, "worker deregistered");
        true
      }
      None => false,
    }
  }

  pub async fn is_registered(&self, task_type: &str) -> bool {
    self.subscriptions.lock().await.contains_key(task_type)
  }

  pub async fn subscription_count(&self) -> usize {
    self.subscriptions.lock().await.len()
  }

  /// All subscriptions, sorted by task type.
  pub async fn subscriptions(&self) -> Vec<SubscriptionInfo> {
    let mut infos: Vec<_> = self
      .subscriptions
      .lock()
      .await
      .iter()
      .map(|(task_type, s)| SubscriptionInfo {
        task_type: task_type.clone(),
        active: !s.handle.is_finished(),
      })
      .collect();
    infos.sort_by(|a, b| a.task_type.cmp(&b.task_type));
    infos
  }

  /// Stop every worker, then wait for in-flight jobs to report.
  pub async fn shutdown(&self) {
    self.cancel.cancel();

    let subscriptions: Vec<_> = self.subscriptions.lock().await.drain().collect();
    for (task_type, subscription) in subscriptions {
      if let Err(e) = subscription.handle.await {
        error!(task_type = %task_type, error = %e, "worker loop panicked");
      }
    }

    self.jobs.close();
    self.jobs.wait().await;
    info!("worker registry shut down");
  }
}

/// Claim jobs until cancelled, then hand the stream back to the engine.
async fn run_worker(
  engine: Arc<dyn WorkflowEngineClient>,
  mut stream: JobStream,
  handler: Arc<dyn JobHandler>,
  cancel: CancellationToken,
  jobs: TaskTracker,
) {
  let task_type = stream.task_type().to_string();
  info!(task_type = %task_type, "worker started");

  loop {
    tokio::select! {
      _ = cancel.cancelled() => {
        info!(task_type = %task_type, "worker cancelled");
        break;
      }
      job = stream.next() => match job {
        Some(job) => {
          jobs.spawn(execute_job(engine.clone(), handler.clone(), job));
        }
        None => {
          warn!(task_type = %task_type, "job stream closed");
          return;
        }
      }
    }
  }

  engine.release(stream).await;
}

/// Run the handler for one job and report exactly one terminal outcome.
#[instrument(
  name = "job_execute",
  skip_all,
  fields(
    job_key = %job.job_key,
    task_type = %job.task_type,
    instance_key = %job.instance_key,
  )
)]
async fn execute_job(
  engine: Arc<dyn WorkflowEngineClient>,
  handler: Arc<dyn JobHandler>,
  job: Job,
) {
  info!("job started");
  let job_key = job.job_key;

  // Run on its own task so a panic surfaces as a JoinError instead of
  // leaving the job without an outcome.
  let run = tokio::spawn(async move { handler.handle(&job).await });

  let reported = match run.await {
    Ok(Ok(variables)) => {
      info!("job completed");
      engine.complete_job(job_key, variables).await
    }
    Ok(Err(e)) => {
      warn!(error = %e, "job failed");
      engine.fail_job(job_key, e.payload()).await
    }
    Err(e) => {
      error!(error = %e, "job handler panicked");
      let payload = serde_json::json!({ "message": format!("job handler panicked: {}", e) });
      engine.fail_job(job_key, payload).await
    }
  };

  if let Err(e) = reported {
    error!(error = %e, "failed to report job outcome");
  }
}
