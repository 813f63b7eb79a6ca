//! Process artifacts understood by the in-process engine.

use serde::{Deserialize, Serialize};

/// A deployable process: an ordered list of tasks, each completed by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessArtifact {
  pub process_id: String,
  #[serde(default)]
  pub name: Option<String>,
  pub tasks: Vec<TaskDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDef {
  pub task_type: String,
}

impl ProcessArtifact {
  /// Parse and validate an artifact from JSON.
  pub fn from_json(content: &str) -> Result<Self, String> {
    let artifact: ProcessArtifact = serde_json::from_str(content).map_err(|e| e.to_string())?;
    artifact.validate()?;
    Ok(artifact)
  }

  fn validate(&self) -> Result<(), String> {
    if self.process_id.trim().is_empty() {
      return Err("process_id must not be empty".to_string());
    }
    if self.tasks.is_empty() {
      return Err(format!("process '{}' has no tasks", self.process_id));
    }
    if let Some(pos) = self.tasks.iter().position(|t| t.task_type.trim().is_empty()) {
      return Err(format!("task {} has an empty task_type", pos));
    }
    Ok(())
  }
}
