//! Error types for the anima core library.

use thiserror::Error;

/// Top-level error type for all anima operations.
///
/// Engine operations over a record snapshot are total and never fail;
/// errors only come from loading/validating configuration and vocabulary
/// data, or from the store collaborator.
#[derive(Error, Debug)]
pub enum AnimaError {
    /// Invalid engine configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Vocabulary table failed to parse or contains unusable entries.
    #[error("Vocabulary error: {0}")]
    Vocabulary(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The record store collaborator failed.
    #[error("Store error: {0}")]
    Store(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, AnimaError>;
