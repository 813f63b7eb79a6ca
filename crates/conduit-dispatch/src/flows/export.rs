use conduit_worker::FileUpload;
use tracing::info;

use crate::command::{Command, CommandKind, ExportKind};
use crate::context::CommandContext;
use crate::error::CommandError;

/// `export {dashboard|report} <id>`: export one definition and upload it.
pub(super) async fn run(ctx: &CommandContext, command: &Command) -> Result<(), CommandError> {
  let [kind, id] = command.raw_arguments.as_slice() else {
    return Err(command.usage_error());
  };
  let kind = ExportKind::from_name(kind).ok_or_else(|| command.usage_error())?;
  let reporting = ctx
    .reporting
    .as_ref()
    .ok_or(CommandError::NotConfigured {
      command: CommandKind::Export,
    })?;

  reporting.readiness().await?;
  reporting.enable_sharing().await?;

  let ids = [id.clone()];
  let definitions = match kind {
    ExportKind::Dashboard => reporting.export_dashboard_definitions(&ids).await?,
    ExportKind::Report => reporting.export_report_definitions(&ids).await?,
  };
  let bytes = serde_json::to_vec_pretty(&definitions)?;

  ctx
    .channel
    .send_message(
      &command.reply_channel,
      &format!("Here is your updated Optimize {} to upload:", kind.name()),
    )
    .await?;
  ctx
    .channel
    .upload_file(
      &command.reply_channel,
      FileUpload {
        filename: kind.filename(),
        filetype: "json".to_string(),
        title: kind.title().to_string(),
        bytes,
      },
    )
    .await?;

  info!(kind = kind.name(), id = %id, "definition exported");
  Ok(())
}
