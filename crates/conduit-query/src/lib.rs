//! Conduit Query
//!
//! The query side is a read-optimized store that catches up with the engine
//! some time after an instance finishes. Reading right after completion can
//! observe nothing, or an instance that still looks active. That is not
//! evidence of anything; it only means the store is behind.
//!
//! [`ReconciliationReader`] turns this into a bounded poll with three
//! distinct outcomes: reconciled data, a terminal state other than
//! completed, or an explicit "gave up" once the budget is spent.
//!
//! Two [`QueryService`] implementations are provided:
//! - [`ProjectionStore`]: an in-process read model fed by engine events,
//!   with a configurable visibility lag
//! - [`OperateClient`]: HTTP client for an Operate-style REST API

mod error;
mod operate;
mod projection;
mod reader;
mod service;

pub use error::{QueryError, ReconcileError};
pub use operate::OperateClient;
pub use projection::ProjectionStore;
pub use reader::{PollPolicy, ReconciledState, ReconciliationOutcome, ReconciliationReader};
pub use service::{InstanceSnapshot, InstanceState, QueryService};
