use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::enums::RetryBackoff;
use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConduitConfig {
  pub weather: WeatherConfig,
  pub weather_source: WeatherSourceConfig,
  pub deadlines: DeadlineConfig,
  pub reconciliation: ReconciliationConfig,
  pub query: QueryConfig,
  pub reporting: ReportingConfig,
}

impl ConduitConfig {
  /// Load configuration from a JSON file, or defaults when no path is given.
  pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
    let config = match path {
      Some(path) => {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
          path: path.to_path_buf(),
          source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
          path: path.to_path_buf(),
          source,
        })?
      }
      None => Self::default(),
    };

    config.validate()?;
    Ok(config)
  }

  /// Check values that serde cannot reject on its own.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.weather.process_id.trim().is_empty() {
      return Err(ConfigError::Invalid {
        field: "weather.process_id".to_string(),
        message: "must not be empty".to_string(),
      });
    }
    if self.reconciliation.max_attempts == 0 {
      return Err(ConfigError::Invalid {
        field: "reconciliation.max_attempts".to_string(),
        message: "must be at least 1".to_string(),
      });
    }
    if self.deadlines.instance_timeout_ms == 0 {
      return Err(ConfigError::Invalid {
        field: "deadlines.instance_timeout_ms".to_string(),
        message: "must be greater than zero".to_string(),
      });
    }
    Ok(())
  }
}

/// The weather workflow: which artifact to deploy and which task types it uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
  pub artifact_path: PathBuf,
  pub process_id: String,
  /// Task type that fetches the reading for a city.
  pub lookup_task_type: String,
  /// Task type that reports the reading back to the requester.
  pub report_task_type: String,
}

impl Default for WeatherConfig {
  fn default() -> Self {
    Self {
      artifact_path: PathBuf::from("weather-checker.json"),
      process_id: "node-slackbot".to_string(),
      lookup_task_type: "weather-lookup".to_string(),
      report_task_type: "service-task".to_string(),
    }
  }
}

/// Where weather readings come from. Without `api_url` a static table is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSourceConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub api_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub api_key: Option<String>,
  pub units: String,
}

impl Default for WeatherSourceConfig {
  fn default() -> Self {
    Self {
      api_url: None,
      api_key: None,
      units: "imperial".to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlineConfig {
  /// Upper bound on waiting for an instance to reach a terminal state.
  pub instance_timeout_ms: u64,
}

impl Default for DeadlineConfig {
  fn default() -> Self {
    Self {
      instance_timeout_ms: 60_000,
    }
  }
}

impl DeadlineConfig {
  pub fn instance_timeout(&self) -> Duration {
    Duration::from_millis(self.instance_timeout_ms)
  }
}

/// Polling budget for reading post-completion state from the query side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
  pub initial_delay_ms: u64,
  pub poll_interval_ms: u64,
  pub max_wait_ms: u64,
  pub max_attempts: u32,
  pub backoff: RetryBackoff,
}

impl Default for ReconciliationConfig {
  fn default() -> Self {
    Self {
      initial_delay_ms: 1_000,
      poll_interval_ms: 500,
      max_wait_ms: 15_000,
      max_attempts: 10,
      backoff: RetryBackoff::Exponential,
    }
  }
}

impl ReconciliationConfig {
  pub fn initial_delay(&self) -> Duration {
    Duration::from_millis(self.initial_delay_ms)
  }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }

  pub fn max_wait(&self) -> Duration {
    Duration::from_millis(self.max_wait_ms)
  }
}

/// Query side. With `operate_base_url` unset, the in-process projection is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub operate_base_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub operate_token: Option<String>,
  /// Visibility lag of the in-process projection.
  pub projection_lag_ms: u64,
}

impl Default for QueryConfig {
  fn default() -> Self {
    Self {
      operate_base_url: None,
      operate_token: None,
      projection_lag_ms: 250,
    }
  }
}

impl QueryConfig {
  pub fn projection_lag(&self) -> Duration {
    Duration::from_millis(self.projection_lag_ms)
  }
}

/// Reporting service used by the export and label commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub optimize_base_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub optimize_token: Option<String>,
  /// Process definition whose variables the label command annotates.
  pub definition_key: String,
}

impl Default for ReportingConfig {
  fn default() -> Self {
    Self {
      optimize_base_url: None,
      optimize_token: None,
      definition_key: "node-slackbot-demo".to_string(),
    }
  }
}
