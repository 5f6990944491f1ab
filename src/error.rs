//! Volunteer Matrix error types

use thiserror::Error;

/// Volunteer Matrix error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data service rejected or failed a request
    #[error("Data service error: {0}")]
    Service(String),

    /// Snapshot document is malformed or incomplete
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Flat-file storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Volunteer Matrix operations
pub type Result<T> = std::result::Result<T, Error>;
