//! Environment overrides for endpoints and secrets.
//!
//! Secrets never live in the JSON file; they are read from the process
//! environment, optionally seeded from a `.env` file.

use crate::config::ConduitConfig;

pub const OPTIMIZE_BASE_URL: &str = "OPTIMIZE_BASE_URL";
pub const OPTIMIZE_TOKEN: &str = "OPTIMIZE_TOKEN";
pub const OPERATE_BASE_URL: &str = "OPERATE_BASE_URL";
pub const OPERATE_TOKEN: &str = "OPERATE_TOKEN";
pub const WEATHER_API_URL: &str = "WEATHER_API_URL";
pub const WEATHER_API_KEY: &str = "WEATHER_API_KEY";

/// Load `.env` from the working directory if present.
///
/// Returns `true` when a file was loaded.
pub fn load_dotenv() -> bool {
  dotenvy::dotenv().is_ok()
}

/// Apply overrides from the process environment.
pub fn apply_env(config: &mut ConduitConfig) {
  apply_overrides(config, |key| std::env::var(key).ok());
}

/// Apply overrides using the given lookup. Empty values are ignored.
pub fn apply_overrides<F>(config: &mut ConduitConfig, lookup: F)
where
  F: Fn(&str) -> Option<String>,
{
  let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

  if let Some(v) = get(OPTIMIZE_BASE_URL) {
    config.reporting.optimize_base_url = Some(v);
  }
  if let Some(v) = get(OPTIMIZE_TOKEN) {
    config.reporting.optimize_token = Some(v);
  }
  if let Some(v) = get(OPERATE_BASE_URL) {
    config.query.operate_base_url = Some(v);
  }
  if let Some(v) = get(OPERATE_TOKEN) {
    config.query.operate_token = Some(v);
  }
  if let Some(v) = get(WEATHER_API_URL) {
    config.weather_source.api_url = Some(v);
  }
  if let Some(v) = get(WEATHER_API_KEY) {
    config.weather_source.api_key = Some(v);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[test]
  fn test_overrides_replace_file_values() {
    let mut config = ConduitConfig::default();
    config.reporting.optimize_base_url = Some("http://from-file".to_string());

    let env = HashMap::from([
      (OPTIMIZE_BASE_URL, "http://optimize:8090"),
      (WEATHER_API_KEY, "secret"),
    ]);
    apply_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

    assert_eq!(
      config.reporting.optimize_base_url.as_deref(),
      Some("http://optimize:8090")
    );
    assert_eq!(config.weather_source.api_key.as_deref(), Some("secret"));
    assert_eq!(config.query.operate_base_url, None);
  }

  #[test]
  fn test_blank_values_are_ignored() {
    let mut config = ConduitConfig::default();
    config.query.operate_token = Some("kept".to_string());

    apply_overrides(&mut config, |key| {
      (key == OPERATE_TOKEN).then(|| "  ".to_string())
    });

    assert_eq!(config.query.operate_token.as_deref(), Some("kept"));
  }
}
