//! Engine error types.

use std::path::PathBuf;

use crate::types::{InstanceKey, JobKey};

/// Errors reported by a workflow engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  /// The artifact could not be read.
  #[error("failed to read artifact {path}: {source}")]
  ArtifactRead {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The artifact was rejected by validation.
  #[error("invalid artifact {path}: {message}")]
  InvalidArtifact { path: PathBuf, message: String },

  /// No definition has been deployed for the process id.
  #[error("process '{process_id}' is not deployed")]
  ProcessNotFound { process_id: String },

  /// The instance reached FAILED.
  #[error("instance {instance_key} failed: {payload}")]
  ProcessFailed {
    instance_key: InstanceKey,
    payload: serde_json::Value,
  },

  /// The engine stopped driving the instance before it reached a terminal state.
  #[error("instance {instance_key} was abandoned by the engine")]
  InstanceAbandoned { instance_key: InstanceKey },

  /// Another worker already holds the job stream for this task type.
  #[error("task type '{task_type}' already has an active subscription")]
  AlreadySubscribed { task_type: String },

  /// The job is unknown or already reached a terminal outcome.
  #[error("job {job_key} is not active")]
  JobNotActive { job_key: JobKey },
}
