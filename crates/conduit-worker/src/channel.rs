//! Reply delivery to requesters.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::ChannelError;

/// Opaque identifier of the conversation a command came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ChannelId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A file sent to a requester.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
  pub filename: String,
  pub filetype: String,
  pub title: String,
  pub bytes: Vec<u8>,
}

/// Where replies to requesters go.
#[async_trait]
pub trait ResponseChannel: Send + Sync {
  async fn send_message(&self, channel: &ChannelId, text: &str) -> Result<(), ChannelError>;

  async fn upload_file(&self, channel: &ChannelId, upload: FileUpload)
  -> Result<(), ChannelError>;
}

/// Something delivered through a [`MemoryChannel`].
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
  Message { channel: ChannelId, text: String },
  File { channel: ChannelId, upload: FileUpload },
}

/// A response channel that records deliveries in memory.
#[derive(Debug, Default)]
pub struct MemoryChannel {
  deliveries: Mutex<Vec<Delivery>>,
  failing: bool,
}

impl MemoryChannel {
  pub fn new() -> Self {
    Self::default()
  }

  /// A channel whose every delivery fails.
  pub fn failing() -> Self {
    Self {
      deliveries: Mutex::new(Vec::new()),
      failing: true,
    }
  }

  pub async fn deliveries(&self) -> Vec<Delivery> {
    self.deliveries.lock().await.clone()
  }

  /// Text of every message sent to `channel`, in order.
  pub async fn messages_for(&self, channel: &ChannelId) -> Vec<String> {
    self
      .deliveries
      .lock()
      .await
      .iter()
      .filter_map(|d| match d {
        Delivery::Message { channel: c, text } if c == channel => Some(text.clone()),
        _ => None,
      })
      .collect()
  }

  fn check(&self, channel: &ChannelId) -> Result<(), ChannelError> {
    if self.failing {
      return Err(ChannelError::Delivery {
        channel: channel.to_string(),
        message: "channel unavailable".to_string(),
      });
    }
    Ok(())
  }
}

#[async_trait]
impl ResponseChannel for MemoryChannel {
  async fn send_message(&self, channel: &ChannelId, text: &str) -> Result<(), ChannelError> {
    self.check(channel)?;
    self.deliveries.lock().await.push(Delivery::Message {
      channel: channel.clone(),
      text: text.to_string(),
    });
    Ok(())
  }

  async fn upload_file(
    &self,
    channel: &ChannelId,
    upload: FileUpload,
  ) -> Result<(), ChannelError> {
    self.check(channel)?;
    self.deliveries.lock().await.push(Delivery::File {
      channel: channel.clone(),
      upload,
    });
    Ok(())
  }
}
