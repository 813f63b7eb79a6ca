use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use conduit_config::ConduitConfig;
use conduit_orchestrator::InstanceOrchestrator;
use conduit_query::{PollPolicy, ReconciliationReader};
use conduit_reporting::ReportingService;
use conduit_worker::ResponseChannel;

/// Settings the command flows read.
#[derive(Debug, Clone)]
pub struct FlowSettings {
  pub artifact_path: PathBuf,
  pub process_id: String,
  pub instance_timeout: Duration,
  pub poll_policy: PollPolicy,
  /// Definition key that label commands apply to.
  pub definition_key: String,
}

impl From<&ConduitConfig> for FlowSettings {
  fn from(config: &ConduitConfig) -> Self {
    Self {
      artifact_path: config.weather.artifact_path.clone(),
      process_id: config.weather.process_id.clone(),
      instance_timeout: config.deadlines.instance_timeout(),
      poll_policy: PollPolicy::from(&config.reconciliation),
      definition_key: config.reporting.definition_key.clone(),
    }
  }
}

/// Everything a command needs, shared by all in-flight commands.
pub struct CommandContext {
  pub orchestrator: InstanceOrchestrator,
  pub reader: ReconciliationReader,
  /// `None` when no reporting service is configured.
  pub reporting: Option<Arc<dyn ReportingService>>,
  pub channel: Arc<dyn ResponseChannel>,
  pub settings: FlowSettings,
}
