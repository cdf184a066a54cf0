//! Terminal client for interactive dataset exploration against a remote
//! analysis service. The library exposes the session, client, renderer, and
//! orchestrator layers; the `datalens` binary wires them to a ratatui TUI or
//! to one-shot text/JSON output.

pub mod cli;
pub mod client;
pub mod error;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod render;
pub mod report;
pub mod session;
#[cfg(feature = "tui")]
pub mod tui;

// Re-export the types most callers need.
pub use error::WorkflowError;
pub use model::{AnalysisRequest, AnalysisResponse, WorkflowEvent};
pub use session::SessionState;
