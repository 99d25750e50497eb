//! sko-planning
//!
//! Boundaries to the external AI collaborators: menu planning (text
//! model), bill scanning (vision model), and footfall forecasting.
//!
//! This crate owns the traits, the strict response decoding, and the
//! resolution of free-form ingredient names to catalog ids. It does
//! **not** write to the DB; callers resolve plans here and hand the
//! resulting `PlannedUse` batch to the pantry service.
//!
//! All calls are one-shot and retry-free: a failure here short-circuits
//! before any reconciliation begins.

pub mod bill;
mod chat;
pub mod forecast;
pub mod menu;
pub mod resolve;

use std::fmt;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that a planning-boundary implementation may return.
#[derive(Debug)]
pub enum PlannerError {
    /// Network or transport failure.
    Transport(String),
    /// The upstream API returned an application-level error.
    Api { code: Option<i64>, message: String },
    /// A response payload could not be decoded into the expected shape.
    Decode(String),
    /// A required configuration value (e.g. API key) is missing or invalid.
    Config(String),
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannerError::Transport(msg) => write!(f, "transport error: {msg}"),
            PlannerError::Api {
                code: Some(c),
                message,
            } => {
                write!(f, "planner api error code={c}: {message}")
            }
            PlannerError::Api {
                code: None,
                message,
            } => {
                write!(f, "planner api error: {message}")
            }
            PlannerError::Decode(msg) => write!(f, "decode error: {msg}"),
            PlannerError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for PlannerError {}
