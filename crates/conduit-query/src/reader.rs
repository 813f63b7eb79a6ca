//! Bounded polling of the query side until it reflects a finished instance.

use std::sync::Arc;
use std::time::Duration;

use conduit_config::{ReconciliationConfig, RetryBackoff};
use conduit_engine::{InstanceKey, Variables};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{QueryError, ReconcileError};
use crate::service::{InstanceState, QueryService};

/// How long and how often to poll.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
  pub initial_delay: Duration,
  pub poll_interval: Duration,
  pub max_wait: Duration,
  pub max_attempts: u32,
  pub backoff: RetryBackoff,
}

impl PollPolicy {
  /// Delay before the next read, after `attempt` reads have been made.
  pub fn delay_for(&self, attempt: u32) -> Duration {
    let attempt = attempt.max(1);
    match self.backoff {
      RetryBackoff::Constant => self.poll_interval,
      RetryBackoff::Linear => self.poll_interval.saturating_mul(attempt),
      RetryBackoff::Exponential => self
        .poll_interval
        .saturating_mul(2u32.saturating_pow(attempt - 1)),
    }
  }
}

impl From<&ReconciliationConfig> for PollPolicy {
  fn from(config: &ReconciliationConfig) -> Self {
    Self {
      initial_delay: config.initial_delay(),
      poll_interval: config.poll_interval(),
      max_wait: config.max_wait(),
      max_attempts: config.max_attempts,
      backoff: config.backoff,
    }
  }
}

/// Data read back once the query side shows the instance as completed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledState {
  pub instance_key: InstanceKey,
  pub process_id: String,
  pub variables: Variables,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconciliationOutcome {
  Reconciled(ReconciledState),
  /// The instance reached a terminal state other than completed.
  NotCompleted { state: InstanceState },
  /// Budget spent without seeing a terminal state.
  Exhausted {
    attempts: u32,
    last_observed: Option<InstanceState>,
  },
}

enum Observation {
  Done(ReconciliationOutcome),
  Pending(Option<InstanceState>),
}

/// Polls a [`QueryService`] until it reflects a terminal instance.
#[derive(Clone)]
pub struct ReconciliationReader {
  query: Arc<dyn QueryService>,
}

impl ReconciliationReader {
  pub fn new(query: Arc<dyn QueryService>) -> Self {
    Self { query }
  }

  /// Wait until the query side shows `key` in a terminal state.
  ///
  /// Absent or active snapshots, transient query errors and reads that do
  /// not answer within the remaining `max_wait` are retried. Other query
  /// errors end the wait immediately.
  #[instrument(skip(self, policy, cancel), fields(instance_key = %key))]
  pub async fn await_reconciled_state(
    &self,
    key: InstanceKey,
    policy: &PollPolicy,
    cancel: &CancellationToken,
  ) -> Result<ReconciliationOutcome, ReconcileError> {
    let started = Instant::now();
    sleep_or_cancel(policy.initial_delay, cancel).await?;

    let mut attempts = 0;
    let mut last_observed = None;

    loop {
      attempts += 1;

      // A read that outlives the remaining budget counts as a miss.
      let remaining = policy.max_wait.saturating_sub(started.elapsed());
      let observed = tokio::select! {
        _ = cancel.cancelled() => return Err(ReconcileError::Cancelled),
        observed = tokio::time::timeout(remaining, self.observe(key)) => observed,
      };

      match observed {
        Err(_) => {
          warn!(attempts, waited = ?started.elapsed(), "query read did not answer in time");
        }
        Ok(Ok(Observation::Done(outcome))) => {
          info!(attempts, "query side caught up");
          return Ok(outcome);
        }
        Ok(Ok(Observation::Pending(state))) => {
          debug!(attempts, ?state, "instance not terminal in query store");
          if state.is_some() {
            last_observed = state;
          }
        }
        Ok(Err(e)) if e.is_transient() => {
          warn!(attempts, error = %e, "transient query failure");
        }
        Ok(Err(e)) => return Err(e.into()),
      }

      let delay = policy.delay_for(attempts);
      let out_of_time = started.elapsed().saturating_add(delay) > policy.max_wait;
      if attempts >= policy.max_attempts || out_of_time {
        warn!(attempts, ?last_observed, "giving up on reconciliation");
        return Ok(ReconciliationOutcome::Exhausted {
          attempts,
          last_observed,
        });
      }

      sleep_or_cancel(delay, cancel).await?;
    }
  }

  async fn observe(&self, key: InstanceKey) -> Result<Observation, QueryError> {
    let Some(snapshot) = self.query.get_instance(key).await? else {
      return Ok(Observation::Pending(None));
    };

    match snapshot.state {
      state if !state.is_terminal() => Ok(Observation::Pending(Some(state))),
      InstanceState::Completed => {
        let variables = self.query.get_variables(key).await?;
        Ok(Observation::Done(ReconciliationOutcome::Reconciled(
          ReconciledState {
            instance_key: snapshot.key,
            process_id: snapshot.process_id,
            variables,
          },
        )))
      }
      state => Ok(Observation::Done(ReconciliationOutcome::NotCompleted {
        state,
      })),
    }
  }
}

async fn sleep_or_cancel(
  delay: Duration,
  cancel: &CancellationToken,
) -> Result<(), ReconcileError> {
  tokio::select! {
    _ = cancel.cancelled() => Err(ReconcileError::Cancelled),
    _ = tokio::time::sleep(delay) => Ok(()),
  }
}
