//! In-process read model fed by engine events.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use conduit_engine::{InstanceEvent, InstanceKey, InstanceNotifier, Variables};
use tokio::time::Instant;
use tracing::debug;

use crate::error::QueryError;
use crate::service::{InstanceSnapshot, InstanceState, QueryService};

/// One recorded version of an instance, readable from `visible_at` on.
#[derive(Debug, Clone)]
struct Revision {
  visible_at: Instant,
  snapshot: InstanceSnapshot,
  variables: Variables,
}

/// A query store that lags behind the engine by a fixed delay.
///
/// Every event that changes an instance appends a revision that becomes
/// readable `lag` after the event. Reads return the newest readable
/// revision, so a reader can see nothing, a stale revision, or the final one.
#[derive(Debug)]
pub struct ProjectionStore {
  lag: Duration,
  revisions: Mutex<HashMap<InstanceKey, Vec<Revision>>>,
}

impl ProjectionStore {
  pub fn new(lag: Duration) -> Self {
    Self {
      lag,
      revisions: Mutex::new(HashMap::new()),
    }
  }

  fn record(
    &self,
    key: InstanceKey,
    process_id: Option<String>,
    state: InstanceState,
    merge: Variables,
  ) {
    let mut revisions = self.revisions.lock().unwrap_or_else(PoisonError::into_inner);
    let history = revisions.entry(key).or_default();

    let (process_id, mut variables) = match history.last() {
      Some(last) => (last.snapshot.process_id.clone(), last.variables.clone()),
      None => (process_id.unwrap_or_default(), Variables::new()),
    };
    variables.extend(merge);

    history.push(Revision {
      visible_at: Instant::now() + self.lag,
      snapshot: InstanceSnapshot {
        key,
        process_id,
        state,
      },
      variables,
    });
    debug!(instance_key = %key, state = ?state, "projection revision recorded");
  }

  /// The newest readable revision. Older revisions can never be read again
  /// and are dropped.
  fn latest_visible(&self, key: InstanceKey) -> Option<Revision> {
    let now = Instant::now();
    let mut revisions = self.revisions.lock().unwrap_or_else(PoisonError::into_inner);
    let history = revisions.get_mut(&key)?;
    let newest = history.iter().rposition(|r| r.visible_at <= now)?;
    history.drain(..newest);
    history.first().cloned()
  }
}

impl InstanceNotifier for ProjectionStore {
  fn notify(&self, event: InstanceEvent) {
    match event {
      InstanceEvent::InstanceCreated {
        instance_key,
        process_id,
        variables,
        ..
      } => self.record(instance_key, Some(process_id), InstanceState::Active, variables),
      InstanceEvent::JobCompleted {
        instance_key,
        variables,
        ..
      } => self.record(instance_key, None, InstanceState::Active, variables),
      InstanceEvent::InstanceCompleted {
        instance_key,
        variables,
      } => self.record(instance_key, None, InstanceState::Completed, variables),
      InstanceEvent::InstanceFailed { instance_key, .. } => {
        self.record(instance_key, None, InstanceState::Failed, Variables::new())
      }
      InstanceEvent::JobCreated { .. } | InstanceEvent::JobFailed { .. } => {}
    }
  }
}

#[async_trait]
impl QueryService for ProjectionStore {
  async fn get_instance(&self, key: InstanceKey) -> Result<Option<InstanceSnapshot>, QueryError> {
    Ok(self.latest_visible(key).map(|r| r.snapshot))
  }

  async fn get_variables(&self, key: InstanceKey) -> Result<Variables, QueryError> {
    Ok(
      self
        .latest_visible(key)
        .map(|r| r.variables)
        .unwrap_or_default(),
    )
  }
}
