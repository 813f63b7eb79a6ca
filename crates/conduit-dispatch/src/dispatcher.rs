use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, instrument, warn};

use crate::ack::{ACK_WINDOW, Acknowledger};
use crate::command::Command;
use crate::context::CommandContext;
use crate::error::{CommandError, DispatchError};
use crate::flows;

/// Acknowledges commands and runs each one on its own task.
///
/// Commands share nothing but the [`CommandContext`]. Cancelling the token
/// passed to [`CommandDispatcher::new`] stops in-flight waits.
pub struct CommandDispatcher {
  context: Arc<CommandContext>,
  tracker: TaskTracker,
  cancel: CancellationToken,
}

impl CommandDispatcher {
  pub fn new(context: CommandContext, cancel: CancellationToken) -> Self {
    Self {
      context: Arc::new(context),
      tracker: TaskTracker::new(),
      cancel,
    }
  }

  /// Acknowledge `command` and start running it.
  ///
  /// Returns once the command is acknowledged and spawned. If the
  /// acknowledgment takes longer than [`ACK_WINDOW`] the command is dropped.
  #[instrument(
    name = "dispatch",
    skip_all,
    fields(command = %command.kind, channel = %command.reply_channel)
  )]
  pub async fn dispatch(
    &self,
    command: Command,
    acknowledger: &dyn Acknowledger,
  ) -> Result<(), DispatchError> {
    if self.tracker.is_closed() {
      return Err(DispatchError::ShuttingDown);
    }

    match tokio::time::timeout(ACK_WINDOW, acknowledger.acknowledge(&command)).await {
      Ok(Ok(())) => {}
      Ok(Err(e)) => {
        error!(error = %e, "acknowledgment failed");
        return Err(DispatchError::Acknowledgment(e));
      }
      Err(_) => {
        error!(window = ?ACK_WINDOW, "acknowledgment timed out, command dropped");
        return Err(DispatchError::AcknowledgmentTimeout { window: ACK_WINDOW });
      }
    }

    let context = self.context.clone();
    let cancel = self.cancel.child_token();
    self.tracker.spawn(handle_command(context, command, cancel));
    Ok(())
  }

  /// Number of commands still running.
  pub fn in_flight(&self) -> usize {
    self.tracker.len()
  }

  /// Stop accepting commands and wait for the running ones.
  pub async fn shutdown(&self) {
    self.tracker.close();
    self.tracker.wait().await;
    info!("dispatcher shut down");
  }
}

/// Run one command to the end and tell the requester about any failure.
#[instrument(
  name = "command",
  skip_all,
  fields(command = %command.kind, channel = %command.reply_channel)
)]
async fn handle_command(context: Arc<CommandContext>, command: Command, cancel: CancellationToken) {
  info!(arguments = ?command.raw_arguments, "command started");

  let result = AssertUnwindSafe(flows::run(&context, &command, &cancel))
    .catch_unwind()
    .await
    .unwrap_or_else(|panic| {
      Err(CommandError::Panicked {
        message: panic_message(panic.as_ref()),
      })
    });

  let err = match result {
    Ok(()) => {
      info!("command finished");
      return;
    }
    Err(e) if e.is_cancelled() => {
      warn!("command cancelled");
      return;
    }
    Err(e) => e,
  };

  error!(error = %err, "command failed");
  let notice = err.notice(command.kind);
  if let Err(e) = context
    .channel
    .send_message(&command.reply_channel, &notice)
    .await
  {
    error!(error = %e, "failed to notify requester");
  }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(s) = panic.downcast_ref::<&str>() {
    s.to_string()
  } else if let Some(s) = panic.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic".to_string()
  }
}
