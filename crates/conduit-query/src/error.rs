use reqwest::StatusCode;

/// Errors from a query service.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
  #[error("invalid base url '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("query service returned {status}: {body}")]
  Status { status: StatusCode, body: String },

  #[error("failed to decode response: {message}")]
  Decode { message: String },
}

impl QueryError {
  /// Whether retrying later can succeed.
  pub fn is_transient(&self) -> bool {
    match self {
      Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
      Self::Status { status, .. } => {
        status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
      }
      Self::InvalidUrl { .. } | Self::Decode { .. } => false,
    }
  }
}

/// Errors that end reconciliation early.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
  #[error("reconciliation cancelled")]
  Cancelled,

  #[error(transparent)]
  Query(#[from] QueryError),
}
