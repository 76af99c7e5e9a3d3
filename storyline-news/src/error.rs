//! Error types for the news module

use thiserror::Error;

/// Errors that can occur while reading feed payloads
#[derive(Debug, Error)]
pub enum NewsError {
    /// Payload is neither RSS nor Atom nor a known JSON shape
    #[error("Parse error: {0}")]
    ParseError(String),

    /// JSON payload could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
