//! Conduit Config
//!
//! Serializable configuration for the command bridge. Every section has
//! defaults, so an empty JSON object (or no file at all) is a valid
//! configuration for running against the in-process engine.
//!
//! Configuration is assembled in three layers:
//! - defaults from the types in this crate
//! - a JSON file (via CLI with `--config=conduit.json`)
//! - environment variables for endpoints and secrets (see [`env`])

mod config;
mod enums;
pub mod env;
mod error;

pub use config::{
  ConduitConfig, DeadlineConfig, QueryConfig, ReconciliationConfig, ReportingConfig,
  WeatherConfig, WeatherSourceConfig,
};
pub use enums::RetryBackoff;
pub use error::ConfigError;
