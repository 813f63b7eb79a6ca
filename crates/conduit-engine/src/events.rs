//! Instance events and notifiers.
//!
//! The engine emits an event for every state transition and job outcome so
//! that consumers can build read models, stream progress, or just log.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::types::{InstanceKey, JobKey, Variables};

/// Events emitted while the engine drives an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstanceEvent {
  /// An instance was created and is now active.
  InstanceCreated {
    instance_key: InstanceKey,
    process_id: String,
    version: u32,
    variables: Variables,
  },

  /// The instance reached a task and a job was queued for it.
  JobCreated {
    instance_key: InstanceKey,
    job_key: JobKey,
    task_type: String,
  },

  /// A worker completed a job.
  JobCompleted {
    instance_key: InstanceKey,
    job_key: JobKey,
    variables: Variables,
  },

  /// A worker failed a job.
  JobFailed {
    instance_key: InstanceKey,
    job_key: JobKey,
    payload: serde_json::Value,
  },

  /// The instance completed with its final variables.
  InstanceCompleted {
    instance_key: InstanceKey,
    variables: Variables,
  },

  /// The instance failed.
  InstanceFailed {
    instance_key: InstanceKey,
    payload: serde_json::Value,
  },
}

impl InstanceEvent {
  pub fn instance_key(&self) -> InstanceKey {
    match self {
      Self::InstanceCreated { instance_key, .. }
      | Self::JobCreated { instance_key, .. }
      | Self::JobCompleted { instance_key, .. }
      | Self::JobFailed { instance_key, .. }
      | Self::InstanceCompleted { instance_key, .. }
      | Self::InstanceFailed { instance_key, .. } => *instance_key,
    }
  }
}

/// Trait for receiving instance events.
///
/// The engine calls `notify` synchronously from the task driving the
/// instance, so implementations must not block.
pub trait InstanceNotifier: Send + Sync {
  fn notify(&self, event: InstanceEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl InstanceNotifier for NoopNotifier {
  fn notify(&self, _event: InstanceEvent) {}
}

/// A notifier that forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls an instance. Event volume is a
  // handful per instance.
  sender: mpsc::UnboundedSender<InstanceEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<InstanceEvent>) -> Self {
    Self { sender }
  }
}

impl InstanceNotifier for ChannelNotifier {
  fn notify(&self, event: InstanceEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
