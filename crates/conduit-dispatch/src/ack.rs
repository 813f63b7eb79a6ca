use std::time::Duration;

use async_trait::async_trait;
use conduit_worker::ChannelError;

use crate::command::Command;

/// Time allowed for acknowledging a command before the caller gives up on it.
pub const ACK_WINDOW: Duration = Duration::from_secs(3);

/// Tells the command source that a command was received.
#[async_trait]
pub trait Acknowledger: Send + Sync {
  async fn acknowledge(&self, command: &Command) -> Result<(), ChannelError>;
}

/// Acknowledger for sources that need no acknowledgment.
#[derive(Debug, Clone, Default)]
pub struct NoopAcknowledger;

#[async_trait]
impl Acknowledger for NoopAcknowledger {
  async fn acknowledge(&self, _command: &Command) -> Result<(), ChannelError> {
    Ok(())
  }
}
