//! Error types for packwright-store

use thiserror::Error;

/// Errors that can occur at the storage and remote-source boundary
#[derive(Error, Debug)]
pub enum StoreError {
    /// Key (or URL) does not exist in the backend
    #[error("not found: {key}")]
    NotFound { key: String },

    /// Backend answered with a non-success HTTP status
    #[error("unexpected status {status} for {key}")]
    Status { key: String, status: u16 },

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request exceeded its time budget
    #[error("timed out after {secs}s: {key}")]
    Timeout { key: String, secs: u64 },

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Key is empty or escapes the store root
    #[error("invalid key: {key}")]
    InvalidKey { key: String },

    /// Backend refused a request by configuration or fault injection
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether this error means "nothing stored there", as opposed to a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Http(err.to_string())
    }
}
