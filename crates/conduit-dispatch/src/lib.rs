//! Conduit Dispatch
//!
//! Entry point for inbound commands. The [`CommandDispatcher`] acknowledges a
//! command within [`ACK_WINDOW`], then runs it on its own task and returns.
//! Every failure is caught at the command boundary, logged, and reported
//! back to the requester on the command's reply channel.
//!
//! Commands:
//! - `weather [city]`: run the weather process and reconcile its result
//! - `export {dashboard|report} <id>`: export a reporting definition as a file
//! - `label <variable> <type> <label...>`: label a process variable

mod ack;
mod command;
mod context;
mod dispatcher;
mod error;
mod flows;

pub use ack::{ACK_WINDOW, Acknowledger, NoopAcknowledger};
pub use command::{Command, CommandKind, ExportKind};
pub use context::{CommandContext, FlowSettings};
pub use dispatcher::CommandDispatcher;
pub use error::{CommandError, DispatchError};
