use async_trait::async_trait;
use conduit_engine::{Job, Variables};

use crate::error::JobError;

/// Business logic run for each job of a task type.
///
/// The return value is the job's single terminal outcome: `Ok` variables
/// complete the job, `Err` fails it. Handlers for unrelated jobs run
/// concurrently and must not rely on shared mutable state; anything a later
/// task needs travels through the returned variables.
#[async_trait]
pub trait JobHandler: Send + Sync {
  async fn handle(&self, job: &Job) -> Result<Variables, JobError>;
}
