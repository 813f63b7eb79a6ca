//! One flow per command kind.

mod export;
mod label;
mod weather;

use tokio_util::sync::CancellationToken;

use crate::command::{Command, CommandKind};
use crate::context::CommandContext;
use crate::error::CommandError;

pub(crate) async fn run(
  ctx: &CommandContext,
  command: &Command,
  cancel: &CancellationToken,
) -> Result<(), CommandError> {
  match command.kind {
    CommandKind::Weather => weather::run(ctx, command, cancel).await,
    CommandKind::Export => export::run(ctx, command).await,
    CommandKind::Label => label::run(ctx, command).await,
  }
}
