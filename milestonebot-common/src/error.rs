// ================================================================
// File: milestonebot-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Session state faults, surfaced to the command layer:
    #[error("Tracking is already running in channel {0}")]
    AlreadyRunning(String),

    #[error("Tracking is not running")]
    NotRunning,

    #[error("Invalid milestone goal: {0}")]
    InvalidGoal(i64),

    // Absorbed inside the metrics source, never seen by the session:
    #[error("Metrics fetch failed: {0}")]
    FetchFailed(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for the faults a chat user can cause and should be told about.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::AlreadyRunning(_) | Error::NotRunning | Error::InvalidGoal(_)
        )
    }
}
