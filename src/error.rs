//! Error taxonomy for workflow actions.
//!
//! Every way an action can fail collapses into one enum so the orchestrator
//! can carry failures in events and surface a single notification per
//! action. Application-boundary failures (terminal setup, CLI misuse) stay
//! on `anyhow` instead.

use thiserror::Error;

use crate::model::ActionKind;

/// Failure modes of a single user-triggered action.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// A local input is missing or empty; the service was never contacted.
    #[error("{0}")]
    Validation(String),
    /// The action needs a dataset that has not been established yet.
    #[error("{0}")]
    Precondition(String),
    /// Network failure, or a response body that could not be understood.
    #[error("transport: {0}")]
    Transport(String),
    /// The service reported an error of its own.
    #[error("service: {0}")]
    Service(String),
    /// The payload did not match the shape expected for the endpoint.
    #[error("render: {0}")]
    Render(String),
    /// Rejected because a session-mutating action is still in flight.
    #[error("busy: {} is still running", .0.label())]
    Busy(ActionKind),
}
