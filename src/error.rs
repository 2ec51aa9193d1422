//! Error types for chatdesk

use thiserror::Error;

/// The main error type for chatdesk operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport-level HTTP failures
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The endpoint answered with a body missing the expected fields
    #[error("Unexpected response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    /// The indexing endpoint refused the document
    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    /// A conversation id that is not in the store
    #[error("Unknown conversation: {0}")]
    UnknownConversation(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// A specialized Result type for chatdesk operations
pub type Result<T> = std::result::Result<T, Error>;
