use conduit_engine::{InstanceKey, InstanceResult, Variables};
use serde::{Deserialize, Serialize};

/// Terminal status of an instance. `run` only returns once one is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
  Completed,
  Failed,
}

/// One workflow instance.
///
/// Outputs exist only for completed instances; the constructors are the
/// only way to set status, so the two cannot disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
  instance_key: InstanceKey,
  process_id: String,
  input_variables: Variables,
  status: InstanceStatus,
  output_variables: Option<Variables>,
}

impl WorkflowInstance {
  /// An instance that completed with the engine's final variables.
  pub fn completed(input_variables: Variables, result: InstanceResult) -> Self {
    Self {
      instance_key: result.instance_key,
      process_id: result.process_id,
      input_variables,
      status: InstanceStatus::Completed,
      output_variables: Some(result.variables),
    }
  }

  /// An instance the engine reported as failed.
  pub fn failed(instance_key: InstanceKey, process_id: String, input_variables: Variables) -> Self {
    Self {
      instance_key,
      process_id,
      input_variables,
      status: InstanceStatus::Failed,
      output_variables: None,
    }
  }

  pub fn instance_key(&self) -> InstanceKey {
    self.instance_key
  }

  pub fn process_id(&self) -> &str {
    &self.process_id
  }

  pub fn input_variables(&self) -> &Variables {
    &self.input_variables
  }

  pub fn status(&self) -> InstanceStatus {
    self.status
  }

  /// Final variables; `Some` iff the status is `Completed`.
  pub fn output_variables(&self) -> Option<&Variables> {
    self.output_variables.as_ref()
  }
}
