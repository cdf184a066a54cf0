//! Workflow orchestration.
//!
//! This module owns the session, checks action preconditions, serializes
//! session-mutating actions, and emits events. UI/CLI layers call into this
//! module to keep responsibilities separated.

mod command;
mod controller;

pub use command::Command;
pub use controller::Controller;
