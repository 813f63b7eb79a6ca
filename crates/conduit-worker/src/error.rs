use conduit_engine::EngineError;

/// Errors raised while delivering a reply to a requester.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
  #[error("delivery to channel '{channel}' failed: {message}")]
  Delivery { channel: String, message: String },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Errors a job handler reports. Each one becomes a `fail_job` payload.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
  #[error("weather lookup failed for '{city}': {message}")]
  Lookup { city: String, message: String },

  #[error("failed to deliver reply: {0}")]
  Reply(#[from] ChannelError),

  #[error("{0}")]
  Other(String),
}

impl JobError {
  /// Payload handed to the engine when failing the job.
  pub fn payload(&self) -> serde_json::Value {
    serde_json::json!({ "message": self.to_string() })
  }
}

/// Errors raised by the worker registry.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
  #[error("failed to subscribe to task type '{task_type}': {source}")]
  Subscribe {
    task_type: String,
    #[source]
    source: EngineError,
  },

  #[error("worker registry is shut down")]
  ShutDown,
}
