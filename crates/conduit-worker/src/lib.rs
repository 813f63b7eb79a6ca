//! Conduit Worker
//!
//! Workers claim jobs from the engine and run a [`JobHandler`] for each one.
//! The [`WorkerRegistry`] owns every subscription in the process and is the
//! only place that talks to the engine's job API:
//!
//! - `register` is idempotent per task type and belongs at process start,
//!   never on a per-command path
//! - each job gets exactly one terminal report: `Ok` from the handler
//!   completes it, `Err` or a panic fails it
//!
//! Handlers reply to requesters through a [`ResponseChannel`]. The channel to
//! reply on travels with the instance in the [`REPLY_CHANNEL_VAR`] variable.

mod channel;
mod error;
mod handler;
mod registry;
pub mod weather;

pub use channel::{ChannelId, Delivery, FileUpload, MemoryChannel, ResponseChannel};
pub use error::{ChannelError, JobError, WorkerError};
pub use handler::JobHandler;
pub use registry::{Registration, SubscriptionInfo, WorkerRegistry};

/// Instance variable that names the channel a handler replies on.
pub const REPLY_CHANNEL_VAR: &str = "reply_channel";
