//! Response channel for a terminal session.

use std::path::PathBuf;

use async_trait::async_trait;
use conduit_worker::{ChannelError, ChannelId, FileUpload, ResponseChannel};
use tracing::info;

/// Prints messages to stdout and writes uploads into a directory.
pub struct StdoutChannel {
  out_dir: PathBuf,
}

impl StdoutChannel {
  pub fn new(out_dir: PathBuf) -> Self {
    Self { out_dir }
  }
}

#[async_trait]
impl ResponseChannel for StdoutChannel {
  async fn send_message(&self, channel: &ChannelId, text: &str) -> Result<(), ChannelError> {
    println!("[{channel}] {text}");
    Ok(())
  }

  async fn upload_file(&self, channel: &ChannelId, upload: FileUpload) -> Result<(), ChannelError> {
    tokio::fs::create_dir_all(&self.out_dir).await?;
    let path = self.out_dir.join(&upload.filename);
    tokio::fs::write(&path, &upload.bytes).await?;

    info!(path = %path.display(), bytes = upload.bytes.len(), "upload written");
    println!("[{channel}] {} ({}): {}", upload.title, upload.filetype, path.display());
    Ok(())
  }
}
