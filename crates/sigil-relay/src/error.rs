//! Error types for sigil-relay

use thiserror::Error;

/// Result type alias using sigil-relay Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while translating and relaying a request
#[derive(Error, Debug)]
pub enum Error {
    /// A conversation turn did not match the expected shape
    #[error("Malformed turn: {0}")]
    MalformedTurn(String),

    /// The translated request cannot be sent (e.g. no messages)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An image reference could not be resolved to bytes
    #[error("Image resolution failed: {0}")]
    Resolution(String),

    /// A failure from the inference backend
    #[error(transparent)]
    Backend(#[from] sigil_ai::Error),
}

impl Error {
    /// True for errors caused by the caller's input shape
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::MalformedTurn(_))
    }
}
