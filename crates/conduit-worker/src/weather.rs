//! Handlers for the weather workflow.
//!
//! The workflow has two tasks: a lookup that attaches a reading to the
//! instance, and a report that replies to the requester. Both always reach a
//! terminal outcome; bad input is answered, not thrown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conduit_engine::{Job, Variables};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::REPLY_CHANNEL_VAR;
use crate::channel::{ChannelId, ResponseChannel};
use crate::error::JobError;
use crate::handler::JobHandler;

/// Variable the report handler sets on completion.
pub const OUTCOME_VAR: &str = "serviceTaskOutcome";
pub const OUTCOME_TEXT: &str = "Weather returned!";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Current conditions for a city.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
  pub temperature: f64,
  pub feels_like: f64,
}

/// Errors from a weather source.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
  #[error("request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("unexpected status {0}")]
  Status(StatusCode),
}

/// Where readings come from.
#[async_trait]
pub trait WeatherSource: Send + Sync {
  /// The reading for `city`, or `None` if the city is unknown.
  async fn current(&self, city: &str) -> Result<Option<WeatherReading>, WeatherError>;
}

/// A fixed table of readings, keyed case-insensitively by city.
#[derive(Debug, Clone, Default)]
pub struct StaticWeatherSource {
  readings: HashMap<String, WeatherReading>,
}

impl StaticWeatherSource {
  pub fn new() -> Self {
    Self::default()
  }

  /// A small table for demos.
  pub fn sample() -> Self {
    Self::new()
      .with_reading("Seattle", 60.0, 58.0)
      .with_reading("London", 52.0, 49.0)
      .with_reading("Berlin", 47.0, 43.0)
      .with_reading("Austin", 88.0, 91.0)
  }

  pub fn with_reading(mut self, city: &str, temperature: f64, feels_like: f64) -> Self {
    self.readings.insert(
      city.to_lowercase(),
      WeatherReading {
        temperature,
        feels_like,
      },
    );
    self
  }
}

#[async_trait]
impl WeatherSource for StaticWeatherSource {
  async fn current(&self, city: &str) -> Result<Option<WeatherReading>, WeatherError> {
    Ok(self.readings.get(&city.to_lowercase()).copied())
  }
}

/// OpenWeather-shaped HTTP source: `GET {url}?q={city}&units={units}&appid={key}`.
pub struct HttpWeatherSource {
  client: Client,
  url: String,
  api_key: Option<String>,
  units: String,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
  main: MainReading,
}

#[derive(Debug, Deserialize)]
struct MainReading {
  temp: f64,
  feels_like: f64,
}

impl HttpWeatherSource {
  pub fn new(
    url: impl Into<String>,
    api_key: Option<String>,
    units: impl Into<String>,
  ) -> Result<Self, WeatherError> {
    Ok(Self {
      client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
      url: url.into(),
      api_key,
      units: units.into(),
    })
  }
}

#[async_trait]
impl WeatherSource for HttpWeatherSource {
  async fn current(&self, city: &str) -> Result<Option<WeatherReading>, WeatherError> {
    let mut query = vec![("q", city), ("units", self.units.as_str())];
    if let Some(key) = &self.api_key {
      query.push(("appid", key.as_str()));
    }

    let response = self.client.get(&self.url).query(&query).send().await?;

    match response.status() {
      StatusCode::NOT_FOUND => Ok(None),
      status if status.is_success() => {
        let body: CurrentWeather = response.json().await?;
        Ok(Some(WeatherReading {
          temperature: body.main.temp,
          feels_like: body.main.feels_like,
        }))
      }
      status => Err(WeatherError::Status(status)),
    }
  }
}

/// Attaches `temperature` and `feels_like` for the instance's `city`.
///
/// An empty or unknown city completes with no reading, leaving the report
/// task to answer the requester.
pub struct WeatherLookupHandler {
  source: Arc<dyn WeatherSource>,
}

impl WeatherLookupHandler {
  pub fn new(source: Arc<dyn WeatherSource>) -> Self {
    Self { source }
  }
}

#[async_trait]
impl JobHandler for WeatherLookupHandler {
  async fn handle(&self, job: &Job) -> Result<Variables, JobError> {
    let city = job.str_var("city").unwrap_or_default().trim();
    if city.is_empty() {
      return Ok(Variables::new());
    }

    let reading = self
      .source
      .current(city)
      .await
      .map_err(|e| JobError::Lookup {
        city: city.to_string(),
        message: e.to_string(),
      })?;

    let mut variables = Variables::new();
    match reading {
      Some(reading) => {
        variables.insert("temperature".to_string(), json!(reading.temperature));
        variables.insert("feels_like".to_string(), json!(reading.feels_like));
      }
      None => info!(city = %city, "no reading for city"),
    }
    Ok(variables)
  }
}

/// Replies with the reading and completes with [`OUTCOME_VAR`].
pub struct WeatherReportHandler {
  channel: Arc<dyn ResponseChannel>,
}

impl WeatherReportHandler {
  pub fn new(channel: Arc<dyn ResponseChannel>) -> Self {
    Self { channel }
  }
}

#[async_trait]
impl JobHandler for WeatherReportHandler {
  async fn handle(&self, job: &Job) -> Result<Variables, JobError> {
    let text = report_text(job);

    match job.str_var(REPLY_CHANNEL_VAR) {
      Some(channel) => {
        self
          .channel
          .send_message(&ChannelId::new(channel), &text)
          .await?;
      }
      None => warn!(job_key = %job.job_key, "job has no reply channel, reply dropped"),
    }

    let mut variables = Variables::new();
    variables.insert(OUTCOME_VAR.to_string(), json!(OUTCOME_TEXT));
    Ok(variables)
  }
}

/// The reply for a report job.
pub fn report_text(job: &Job) -> String {
  let city = job.str_var("city").unwrap_or_default();
  let reading = job
    .variables
    .get("temperature")
    .zip(job.variables.get("feels_like"))
    .filter(|(t, f)| !t.is_null() && !f.is_null());

  match reading {
    Some((temperature, feels_like)) if !city.trim().is_empty() => format!(
      "The temperature in {} is currently {} degrees. It feels like {} degrees outside.",
      city,
      display_value(temperature),
      display_value(feels_like)
    ),
    _ => format!("{} is not a valid city", city),
  }
}

/// Numbers print without a trailing `.0`; strings print unquoted.
fn display_value(value: &serde_json::Value) -> String {
  match value {
    serde_json::Value::Number(n) => match n.as_f64() {
      Some(f) => f.to_string(),
      None => n.to_string(),
    },
    serde_json::Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use conduit_engine::{InstanceKey, JobKey};

  fn job(variables: serde_json::Value) -> Job {
    Job {
      job_key: JobKey(7),
      task_type: "service-task".to_string(),
      instance_key: InstanceKey(3),
      process_id: "node-slackbot".to_string(),
      variables: variables.as_object().cloned().unwrap(),
    }
  }

  #[test]
  fn test_report_text_with_reading() {
    let job = job(json!({"city": "Seattle", "temperature": 60, "feels_like": 58}));
    assert_eq!(
      report_text(&job),
      "The temperature in Seattle is currently 60 degrees. It feels like 58 degrees outside."
    );
  }

  #[test]
  fn test_report_text_float_reading() {
    let job = job(json!({"city": "Austin", "temperature": 88.0, "feels_like": 90.5}));
    assert_eq!(
      report_text(&job),
      "The temperature in Austin is currently 88 degrees. It feels like 90.5 degrees outside."
    );
  }

  #[test]
  fn test_report_text_empty_city() {
    let job = job(json!({"city": ""}));
    assert_eq!(report_text(&job), " is not a valid city");
  }

  #[test]
  fn test_report_text_missing_reading() {
    let job = job(json!({"city": "Atlantis"}));
    assert_eq!(report_text(&job), "Atlantis is not a valid city");
  }

  #[tokio::test]
  async fn test_lookup_empty_city_completes_without_reading() {
    let handler = WeatherLookupHandler::new(Arc::new(StaticWeatherSource::sample()));
    let out = handler.handle(&job(json!({"city": "  "}))).await.unwrap();
    assert!(out.is_empty());
  }

  #[tokio::test]
  async fn test_lookup_is_case_insensitive() {
    let handler = WeatherLookupHandler::new(Arc::new(StaticWeatherSource::sample()));
    let out = handler.handle(&job(json!({"city": "seattle"}))).await.unwrap();
    assert_eq!(out["temperature"], json!(60.0));
    assert_eq!(out["feels_like"], json!(58.0));
  }
}
