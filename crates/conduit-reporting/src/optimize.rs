//! HTTP client for an Optimize-style reporting API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::error::ReportingError;
use crate::service::ReportingService;
use crate::types::VariableLabels;

const READINESS: &str = "api/readyz";
const ENABLE_SHARING: &str = "api/public/share/enable";
const EXPORT_DASHBOARDS: &str = "api/public/export/dashboard/definition/json";
const EXPORT_REPORTS: &str = "api/public/export/report/definition/json";
const LABEL_VARIABLES: &str = "api/public/variables/labels";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Reporting client authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct OptimizeClient {
  http: Client,
  base_url: Url,
  token: Option<String>,
}

impl OptimizeClient {
  pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ReportingError> {
    let mut raw = base_url.trim().to_string();
    if !raw.ends_with('/') {
      raw.push('/');
    }
    let base_url = Url::parse(&raw).map_err(|e| ReportingError::InvalidUrl {
      url: base_url.to_string(),
      message: e.to_string(),
    })?;

    Ok(Self {
      http: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
      base_url,
      token,
    })
  }

  fn endpoint(&self, path: &str) -> Result<Url, ReportingError> {
    self.base_url.join(path).map_err(|e| ReportingError::InvalidUrl {
      url: format!("{}{}", self.base_url, path),
      message: e.to_string(),
    })
  }

  fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
    match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  async fn send(&self, request: RequestBuilder) -> Result<Response, ReportingError> {
    let response = self.authorize(request).send().await?;
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ReportingError::Status { status, body })
  }

  async fn export(&self, path: &str, ids: &[String]) -> Result<Value, ReportingError> {
    let request = self.http.post(self.endpoint(path)?).json(ids);
    self
      .send(request)
      .await?
      .json()
      .await
      .map_err(|e| ReportingError::Decode {
        message: e.to_string(),
      })
  }
}

#[async_trait]
impl ReportingService for OptimizeClient {
  #[instrument(skip(self))]
  async fn readiness(&self) -> Result<(), ReportingError> {
    let response = self
      .authorize(self.http.get(self.endpoint(READINESS)?))
      .send()
      .await?;
    let status = response.status();
    if !status.is_success() {
      return Err(ReportingError::NotReady { status });
    }
    debug!("reporting service ready");
    Ok(())
  }

  #[instrument(skip(self))]
  async fn enable_sharing(&self) -> Result<(), ReportingError> {
    self.send(self.http.post(self.endpoint(ENABLE_SHARING)?)).await?;
    debug!("sharing enabled");
    Ok(())
  }

  #[instrument(skip(self))]
  async fn export_dashboard_definitions(&self, ids: &[String]) -> Result<Value, ReportingError> {
    self.export(EXPORT_DASHBOARDS, ids).await
  }

  #[instrument(skip(self))]
  async fn export_report_definitions(&self, ids: &[String]) -> Result<Value, ReportingError> {
    self.export(EXPORT_REPORTS, ids).await
  }

  #[instrument(skip(self, labels), fields(definition_key = %labels.definition_key))]
  async fn label_variables(&self, labels: &VariableLabels) -> Result<(), ReportingError> {
    let request = self.http.post(self.endpoint(LABEL_VARIABLES)?).json(labels);
    self.send(request).await?;
    debug!(count = labels.labels.len(), "variables labelled");
    Ok(())
  }
}
