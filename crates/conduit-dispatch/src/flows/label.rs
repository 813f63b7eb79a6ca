use conduit_reporting::{VariableLabel, VariableLabels};
use tracing::info;

use crate::command::{Command, CommandKind};
use crate::context::CommandContext;
use crate::error::CommandError;

/// `label <variableName> <variableType> <label...>`: label one variable.
pub(super) async fn run(ctx: &CommandContext, command: &Command) -> Result<(), CommandError> {
  let label = parse_label(&command.raw_arguments).ok_or_else(|| command.usage_error())?;
  let reporting = ctx
    .reporting
    .as_ref()
    .ok_or(CommandError::NotConfigured {
      command: CommandKind::Label,
    })?;

  reporting.readiness().await?;

  let confirmation = format!(
    "Labelled {} ({}) as \"{}\".",
    label.variable_name, label.variable_type, label.variable_label
  );
  let labels = VariableLabels::single(ctx.settings.definition_key.clone(), label);
  reporting.label_variables(&labels).await?;
  info!(definition_key = %labels.definition_key, "variable labelled");

  ctx
    .channel
    .send_message(&command.reply_channel, &confirmation)
    .await?;
  Ok(())
}

fn parse_label(arguments: &[String]) -> Option<VariableLabel> {
  let [name, kind, rest @ ..] = arguments else {
    return None;
  };
  if rest.is_empty() {
    return None;
  }
  let joined = rest.join(" ");
  Some(VariableLabel {
    variable_name: name.clone(),
    variable_type: kind.clone(),
    variable_label: strip_quotes(&joined).to_string(),
  })
}

/// Strip one pair of surrounding double quotes.
fn strip_quotes(label: &str) -> &str {
  label
    .strip_prefix('"')
    .and_then(|l| l.strip_suffix('"'))
    .unwrap_or(label)
}
