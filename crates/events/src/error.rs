use std::time::Duration;

use thiserror::Error;

/// Why a single delivery attempt failed.
///
/// These never reach the code that called `publish`; the publisher logs
/// them and counts them.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The sink answered but refused the event.
    #[error("sink rejected event with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    /// The shutdown signal fired while the attempt was running.
    #[error("delivery cancelled by shutdown")]
    Cancelled,
}
