//! HTTP client for an Operate-style query API.

use std::time::Duration;

use async_trait::async_trait;
use conduit_engine::{InstanceKey, Variables};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};
use url::Url;

use crate::error::QueryError;
use crate::service::{InstanceSnapshot, InstanceState, QueryService};

// Large enough for any instance this bot creates.
const VARIABLE_PAGE_SIZE: u32 = 1000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Query client for `GET /v1/process-instances/{key}` and
/// `POST /v1/variables/search`.
#[derive(Debug, Clone)]
pub struct OperateClient {
  http: Client,
  base_url: Url,
  token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessInstanceBody {
  key: u64,
  bpmn_process_id: String,
  state: InstanceState,
}

#[derive(Debug, Deserialize)]
struct VariableSearchBody {
  #[serde(default)]
  items: Vec<VariableItem>,
}

#[derive(Debug, Deserialize)]
struct VariableItem {
  name: String,
  value: String,
}

impl OperateClient {
  pub fn new(base_url: &str, token: Option<String>) -> Result<Self, QueryError> {
    Ok(Self {
      http: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
      base_url: normalize_base(base_url)?,
      token,
    })
  }

  fn endpoint(&self, path: &str) -> Result<Url, QueryError> {
    self.base_url.join(path).map_err(|e| QueryError::InvalidUrl {
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
}

/// Parse a base URL so that relative joins keep its path.
pub(crate) fn normalize_base(base_url: &str) -> Result<Url, QueryError> {
  let mut raw = base_url.trim().to_string();
  if !raw.ends_with('/') {
    raw.push('/');
  }
  Url::parse(&raw).map_err(|e| QueryError::InvalidUrl {
    url: base_url.to_string(),
    message: e.to_string(),
  })
}

async fn check_status(response: Response) -> Result<Response, QueryError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let body = response.text().await.unwrap_or_default();
  Err(QueryError::Status { status, body })
}

/// Variable values are JSON-encoded strings. Anything that does not parse is
/// kept as a plain string.
fn decode_value(raw: String) -> Value {
  serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

#[async_trait]
impl QueryService for OperateClient {
  #[instrument(skip(self), fields(instance_key = %key))]
  async fn get_instance(&self, key: InstanceKey) -> Result<Option<InstanceSnapshot>, QueryError> {
    let url = self.endpoint(&format!("v1/process-instances/{key}"))?;
    let response = self.authorize(self.http.get(url)).send().await?;

    if response.status() == StatusCode::NOT_FOUND {
      debug!("instance not visible yet");
      return Ok(None);
    }

    let body: ProcessInstanceBody = check_status(response)
      .await?
      .json()
      .await
      .map_err(|e| QueryError::Decode {
        message: e.to_string(),
      })?;

    Ok(Some(InstanceSnapshot {
      key: InstanceKey(body.key),
      process_id: body.bpmn_process_id,
      state: body.state,
    }))
  }

  #[instrument(skip(self), fields(instance_key = %key))]
  async fn get_variables(&self, key: InstanceKey) -> Result<Variables, QueryError> {
    let url = self.endpoint("v1/variables/search")?;
    let request = self.http.post(url).json(&json!({
      "filter": { "processInstanceKey": key.0 },
      "size": VARIABLE_PAGE_SIZE,
    }));
    let response = check_status(self.authorize(request).send().await?).await?;

    let body: VariableSearchBody = response.json().await.map_err(|e| QueryError::Decode {
      message: e.to_string(),
    })?;

    Ok(
      body
        .items
        .into_iter()
        .map(|item| (item.name, decode_value(item.value)))
        .collect(),
    )
  }
}
