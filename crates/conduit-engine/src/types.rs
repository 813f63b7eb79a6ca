//! Engine-facing data types.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Variables carried by instances and jobs.
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// Engine-assigned identifier of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceKey(pub u64);

impl fmt::Display for InstanceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Engine-assigned identifier of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKey(pub u64);

impl fmt::Display for JobKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A deployed, versioned workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
  pub process_id: String,
  pub source_artifact_path: PathBuf,
  pub version: u32,
  pub deployed_at: DateTime<Utc>,
}

/// Result of a deploy call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentResult {
  pub definition: WorkflowDefinition,
  /// `true` when the artifact matched the active version and nothing changed.
  pub duplicate: bool,
}

/// Final state of an instance that completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceResult {
  pub instance_key: InstanceKey,
  pub process_id: String,
  pub version: u32,
  pub variables: Variables,
}

/// A unit of work created when an instance reaches a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
  pub job_key: JobKey,
  pub task_type: String,
  pub instance_key: InstanceKey,
  pub process_id: String,
  pub variables: Variables,
}

impl Job {
  /// A string variable, if present and a string.
  pub fn str_var(&self, name: &str) -> Option<&str> {
    self.variables.get(name).and_then(|v| v.as_str())
  }
}
