//! Error types for sigil-ai

use thiserror::Error;

/// Result type alias using sigil-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when starting a generation call. Failures after
/// the stream is open arrive as terminal `StreamEvent::Error` items, not
/// through this type.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),
}
