//! Error types for plan validation and summary submission.

use thiserror::Error;

/// Reasons a plan cannot be turned into a running session.
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("plan has no exercises")]
    EmptyPlan,

    #[error("exercise {} (`{name}`): {reason}", .index + 1)]
    InvalidExercise {
        index: usize,
        name: String,
        reason: String,
    },

    #[error("malformed plan: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failures of the external logging call. The session itself is never
/// affected by these; the summary stays staged for a retry.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("logging endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("logging endpoint is not configured")]
    NoEndpoint,

    #[error("{0}")]
    Other(String),
}
