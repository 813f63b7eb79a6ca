//! Conduit Engine
//!
//! This crate defines the contract Conduit uses to talk to a workflow engine
//! ([`WorkflowEngineClient`]) and ships an in-process implementation
//! ([`LocalEngine`]) that honours the same semantics as a remote engine:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        LocalEngine                           │
//! │  deploy_resource(path)        → versioned definition         │
//! │  create_instance_and_await…   → drives tasks in order        │
//! │  subscribe(task_type)         → JobStream for one worker     │
//! │  complete_job / fail_job      → unblocks the instance        │
//! └──────────────────────────────────────────────────────────────┘
//!                               │ InstanceEvent
//!                               ▼
//!                      InstanceNotifier (read models, logs)
//! ```
//!
//! An instance blocks on each job until a worker reports a terminal outcome.
//! Jobs for a task type with no subscribed worker stay queued; they are not
//! an error, the instance simply does not progress.

mod artifact;
mod client;
mod error;
mod events;
mod local;
mod types;

pub use artifact::{ProcessArtifact, TaskDef};
pub use client::{JobStream, WorkflowEngineClient};
pub use error::EngineError;
pub use events::{ChannelNotifier, InstanceEvent, InstanceNotifier, NoopNotifier};
pub use local::LocalEngine;
pub use types::{
  DeploymentResult, InstanceKey, InstanceResult, Job, JobKey, Variables, WorkflowDefinition,
};
