//! Error types for backend operations

use thiserror::Error;

/// Error type for backend API calls
#[derive(Error, Debug)]
pub enum BackendError {
    /// The request could not be sent or the response not received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not the expected JSON
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered with an unsuccessful status
    #[error("API error: {0}")]
    Api(String),
}

pub type BackendResult<T> = Result<T, BackendError>;
