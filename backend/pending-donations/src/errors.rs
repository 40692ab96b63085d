//! Crate-wide error type shared by the service client, configuration and
//! screen controller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DonationsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The donation service answered with a non-success status.
    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Screen task has stopped")]
    Closed,
}

pub type Result<T> = std::result::Result<T, DonationsError>;
