use async_trait::async_trait;
use conduit_engine::{InstanceKey, Variables};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Instance state as recorded by the query side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceState {
  Active,
  Completed,
  Canceled,
  #[serde(alias = "INCIDENT")]
  Failed,
}

impl InstanceState {
  pub fn is_terminal(self) -> bool {
    !matches!(self, Self::Active)
  }
}

/// An instance as the query side currently sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
  pub key: InstanceKey,
  pub process_id: String,
  pub state: InstanceState,
}

/// Read-only, eventually consistent view of instances.
#[async_trait]
pub trait QueryService: Send + Sync {
  /// The instance, or `None` if the store has not seen it (yet).
  async fn get_instance(&self, key: InstanceKey) -> Result<Option<InstanceSnapshot>, QueryError>;

  /// Variables of the instance. Empty if the store has not seen any.
  async fn get_variables(&self, key: InstanceKey) -> Result<Variables, QueryError>;
}
