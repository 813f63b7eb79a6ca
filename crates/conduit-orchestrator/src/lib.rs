//! Conduit Orchestrator
//!
//! Bridges command handling to the engine. [`InstanceOrchestrator::run`]
//! creates an instance and suspends until the engine reports a terminal
//! state, a deadline passes, or the caller cancels:
//!
//! ```text
//! run(process_id, vars, deadline, cancel)
//!   ├── engine completes      → WorkflowInstance (Completed, outputs set)
//!   ├── engine reports FAILED → OrchestratorError::WorkflowExecution
//!   ├── deadline passes       → OrchestratorError::Timeout
//!   └── cancel fires          → OrchestratorError::Cancelled
//! ```
//!
//! The instance only completes once every one of its jobs has been claimed
//! and finished, so workers for its task types must be registered before
//! `run` is called. An unclaimed job is not an error; it ends in `Timeout`.

mod error;
mod instance;
mod orchestrator;

pub use error::OrchestratorError;
pub use instance::{InstanceStatus, WorkflowInstance};
pub use orchestrator::InstanceOrchestrator;
