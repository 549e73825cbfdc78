//! Nova client errors

use thiserror::Error;

/// Errors that can occur when interacting with the compute API
#[derive(Debug, Error)]
pub enum NovaError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Compute API returned an error
    #[error("Compute API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (bad credentials, no compute endpoint, etc.)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request conflicts with current state (e.g. address already bound)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid request (e.g., ambiguous server name)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
