use conduit_engine::Variables;
use conduit_query::ReconciliationOutcome;
use conduit_worker::REPLY_CHANNEL_VAR;
use conduit_worker::weather::OUTCOME_VAR;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::command::Command;
use crate::context::CommandContext;
use crate::error::CommandError;

/// Deploy the weather process, run it for the requested city, then read the
/// result back from the query side.
///
/// The reply itself comes from the report worker; this flow only speaks up
/// when the query side cannot confirm the result.
pub(super) async fn run(
  ctx: &CommandContext,
  command: &Command,
  cancel: &CancellationToken,
) -> Result<(), CommandError> {
  let settings = &ctx.settings;
  let city = command.argument_text();

  ctx.orchestrator.deploy(&settings.artifact_path).await?;

  let mut variables = Variables::new();
  variables.insert("city".to_string(), Value::String(city));
  variables.insert(
    REPLY_CHANNEL_VAR.to_string(),
    Value::String(command.reply_channel.to_string()),
  );

  let instance = ctx
    .orchestrator
    .run(&settings.process_id, variables, settings.instance_timeout, cancel)
    .await?;
  let instance_key = instance.instance_key();
  info!(
    instance_key = %instance_key,
    outcome = ?instance.output_variables().and_then(|v| v.get(OUTCOME_VAR)),
    "weather instance finished"
  );

  let outcome = ctx
    .reader
    .await_reconciled_state(instance_key, &settings.poll_policy, cancel)
    .await?;

  match outcome {
    ReconciliationOutcome::Reconciled(state) => {
      info!(
        instance_key = %instance_key,
        variables = %serde_json::Value::Object(state.variables),
        "reconciled instance variables"
      );
    }
    ReconciliationOutcome::NotCompleted { state } => {
      warn!(instance_key = %instance_key, ?state, "query side reports instance not completed");
    }
    ReconciliationOutcome::Exhausted {
      attempts,
      last_observed,
    } => {
      warn!(instance_key = %instance_key, attempts, ?last_observed, "results pending");
      ctx
        .channel
        .send_message(
          &command.reply_channel,
          &format!("Results for instance {instance_key} are still pending."),
        )
        .await?;
    }
  }

  Ok(())
}
