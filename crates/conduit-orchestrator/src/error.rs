use std::time::Duration;

use conduit_engine::EngineError;

use crate::instance::WorkflowInstance;

/// Errors from deploying or running an instance.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
  /// The artifact could not be deployed. Engine-side deployments are intact.
  #[error("deployment failed: {source}")]
  Deployment {
    #[source]
    source: EngineError,
  },

  /// The instance could not be created or the engine stopped responding.
  #[error("engine error: {source}")]
  Engine {
    #[source]
    source: EngineError,
  },

  /// The instance reached FAILED. `payload` is the engine's diagnostic.
  #[error("workflow instance {} failed: {payload}", .instance.instance_key())]
  WorkflowExecution {
    instance: Box<WorkflowInstance>,
    payload: serde_json::Value,
  },

  /// No terminal state within the deadline. The instance may still finish.
  #[error("workflow instance did not finish within {waited:?}")]
  Timeout { waited: Duration },

  /// The caller cancelled the wait.
  #[error("wait cancelled")]
  Cancelled,
}
