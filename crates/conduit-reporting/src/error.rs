use reqwest::StatusCode;

/// Errors from the reporting API.
#[derive(Debug, thiserror::Error)]
pub enum ReportingError {
  #[error("invalid base url '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("reporting service is not ready ({status})")]
  NotReady { status: StatusCode },

  #[error("reporting service returned {status}: {body}")]
  Status { status: StatusCode, body: String },

  #[error("failed to decode response: {message}")]
  Decode { message: String },
}
