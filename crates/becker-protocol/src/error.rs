//! Error type for envelope encoding and decoding.

use thiserror::Error;

/// Errors raised while encoding requests or decoding responses.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("message is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("message is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The message parsed as JSON but carries no `id` member, so it cannot be
    /// a response to anything.
    #[error("message has no correlation id")]
    MissingId,
}
