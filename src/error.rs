//! Error types for the Throttlebox service.

use thiserror::Error;

/// Main error type for Throttlebox operations.
#[derive(Error, Debug)]
pub enum ThrottleboxError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Throttlebox operations.
pub type Result<T> = std::result::Result<T, ThrottleboxError>;
