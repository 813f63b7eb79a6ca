use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use conduit_engine::{EngineError, Variables, WorkflowDefinition, WorkflowEngineClient};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::OrchestratorError;
use crate::instance::WorkflowInstance;

/// Deploys definitions and runs instances against a shared engine client.
#[derive(Clone)]
pub struct InstanceOrchestrator {
  engine: Arc<dyn WorkflowEngineClient>,
}

impl InstanceOrchestrator {
  pub fn new(engine: Arc<dyn WorkflowEngineClient>) -> Self {
    Self { engine }
  }

  /// Deploy an artifact. Unchanged artifacts resolve to the active version.
  #[instrument(
    name = "orchestrator_deploy",
    skip(self),
    fields(artifact = %artifact_path.display())
  )]
  pub async fn deploy(
    &self,
    artifact_path: &Path,
  ) -> Result<WorkflowDefinition, OrchestratorError> {
    let result = self
      .engine
      .deploy_resource(artifact_path)
      .await
      .map_err(|source| {
        error!(error = %source, "deployment failed");
        OrchestratorError::Deployment { source }
      })?;

    info!(
      process_id = %result.definition.process_id,
      version = result.definition.version,
      duplicate = result.duplicate,
      "definition deployed"
    );
    Ok(result.definition)
  }

  /// Create an instance and wait for its terminal state.
  ///
  /// Returning `Timeout` or `Cancelled` only stops the wait; the engine keeps
  /// driving the instance.
  #[instrument(
    name = "orchestrator_run",
    skip(self, input_variables, cancel),
    fields(deadline_ms = deadline.as_millis() as u64)
  )]
  pub async fn run(
    &self,
    process_id: &str,
    input_variables: Variables,
    deadline: Duration,
    cancel: &CancellationToken,
  ) -> Result<WorkflowInstance, OrchestratorError> {
    let request = self
      .engine
      .create_instance_and_await_result(process_id, input_variables.clone());

    let outcome = tokio::select! {
      _ = cancel.cancelled() => {
        warn!("instance wait cancelled");
        return Err(OrchestratorError::Cancelled);
      }
      outcome = tokio::time::timeout(deadline, request) => outcome,
    };

    match outcome {
      Ok(Ok(result)) => {
        info!(instance_key = %result.instance_key, "instance completed");
        Ok(WorkflowInstance::completed(input_variables, result))
      }
      Ok(Err(EngineError::ProcessFailed {
        instance_key,
        payload,
      })) => {
        error!(instance_key = %instance_key, payload = %payload, "instance failed");
        Err(OrchestratorError::WorkflowExecution {
          instance: Box::new(WorkflowInstance::failed(
            instance_key,
            process_id.to_string(),
            input_variables,
          )),
          payload,
        })
      }
      Ok(Err(source)) => {
        error!(error = %source, "instance request failed");
        Err(OrchestratorError::Engine { source })
      }
      Err(_) => {
        warn!("instance did not finish before the deadline");
        Err(OrchestratorError::Timeout { waited: deadline })
      }
    }
  }
}
