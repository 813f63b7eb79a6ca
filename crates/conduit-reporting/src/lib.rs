//! Conduit Reporting
//!
//! Export and label commands are single blocking calls into a reporting API.
//! [`ReportingService`] is the contract the dispatcher uses; [`OptimizeClient`]
//! implements it over HTTP.

mod error;
mod optimize;
mod service;
mod types;

pub use error::ReportingError;
pub use optimize::OptimizeClient;
pub use service::ReportingService;
pub use types::{VariableLabel, VariableLabels};
