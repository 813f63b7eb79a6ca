use std::time::Duration;

use conduit_orchestrator::OrchestratorError;
use conduit_query::ReconcileError;
use conduit_reporting::ReportingError;
use conduit_worker::ChannelError;
use serde_json::Value;

use crate::command::CommandKind;

/// Errors returned to the caller of `dispatch`.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
  /// The command was not acknowledged in time and was not run.
  #[error("acknowledgment did not finish within {window:?}")]
  AcknowledgmentTimeout { window: Duration },

  #[error("acknowledgment failed: {0}")]
  Acknowledgment(#[source] ChannelError),

  #[error("dispatcher is shutting down")]
  ShuttingDown,
}

/// Errors raised while running a command. Caught at the command boundary.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
  #[error("unknown command '{name}'")]
  UnknownCommand { name: String },

  #[error("usage: {usage}")]
  Usage { usage: &'static str },

  #[error("{command} is not configured")]
  NotConfigured { command: CommandKind },

  #[error(transparent)]
  Orchestrator(#[from] OrchestratorError),

  #[error(transparent)]
  Reconcile(#[from] ReconcileError),

  #[error(transparent)]
  Reporting(#[from] ReportingError),

  #[error("failed to reply: {0}")]
  Reply(#[from] ChannelError),

  #[error("failed to encode export: {0}")]
  Encode(#[from] serde_json::Error),

  #[error("command panicked: {message}")]
  Panicked { message: String },
}

impl CommandError {
  /// Cancellation only happens on shutdown and is not reported.
  pub fn is_cancelled(&self) -> bool {
    matches!(
      self,
      Self::Orchestrator(OrchestratorError::Cancelled) | Self::Reconcile(ReconcileError::Cancelled)
    )
  }

  /// Text sent to the requester when `command` fails with this error.
  pub fn notice(&self, command: CommandKind) -> String {
    match self {
      Self::UnknownCommand { name } => format!("Unknown command /{name}."),
      Self::Usage { usage } => format!("Usage: {usage}"),
      Self::NotConfigured { command } => format!("{command} is not configured."),
      Self::Orchestrator(OrchestratorError::WorkflowExecution { payload, .. }) => {
        format!("The {} workflow failed: {}", command.name(), diagnostic(payload))
      }
      _ => format!("Sorry, {command} failed. Please try again later."),
    }
  }
}

fn diagnostic(payload: &Value) -> String {
  match payload.get("message").and_then(Value::as_str) {
    Some(message) => message.to_string(),
    None => payload.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_generic_notice_names_command() {
    let err = CommandError::Orchestrator(OrchestratorError::Timeout {
      waited: Duration::from_secs(60),
    });
    assert_eq!(
      err.notice(CommandKind::Weather),
      "Sorry, /weather failed. Please try again later."
    );
  }

  #[test]
  fn test_diagnostic_prefers_message() {
    assert_eq!(diagnostic(&json!({"message": "no such city"})), "no such city");
    assert_eq!(diagnostic(&json!({"code": 7})), r#"{"code":7}"#);
  }

  #[test]
  fn test_cancellation_is_recognised() {
    assert!(CommandError::Orchestrator(OrchestratorError::Cancelled).is_cancelled());
    assert!(CommandError::Reconcile(ReconcileError::Cancelled).is_cancelled());
    assert!(!CommandError::NotConfigured {
      command: CommandKind::Export
    }
    .is_cancelled());
  }
}
