use async_trait::async_trait;
use serde_json::Value;

use crate::error::ReportingError;
use crate::types::VariableLabels;

/// Reporting API used by the export and label commands.
#[async_trait]
pub trait ReportingService: Send + Sync {
  /// Succeeds once the service accepts requests.
  async fn readiness(&self) -> Result<(), ReportingError>;

  async fn enable_sharing(&self) -> Result<(), ReportingError>;

  /// Definitions of the given dashboards, as returned by the service.
  async fn export_dashboard_definitions(&self, ids: &[String]) -> Result<Value, ReportingError>;

  /// Definitions of the given reports, as returned by the service.
  async fn export_report_definitions(&self, ids: &[String]) -> Result<Value, ReportingError>;

  async fn label_variables(&self, labels: &VariableLabels) -> Result<(), ReportingError>;
}
