//! Error types for Medchain Core.

use thiserror::Error;

/// Core errors that can occur while building or checking transactions.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Content was null or failed to parse into its variant.
    #[error("invalid content: {0}")]
    InvalidContent(String),

    /// Content tag outside the closed variant set.
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Malformed hex, wrong key/signature length, or a key that is not a curve point.
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("invalid signature")]
    InvalidSignature,

    /// Stored transaction id does not match the id derived from its signature.
    #[error("transaction id mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: String, actual: String },

    #[error("malformed block: {0}")]
    MalformedBlock(String),

    /// Stored block id does not match the id recomputed from its contents.
    #[error("block id mismatch: expected {expected}, got {actual}")]
    BlockIdMismatch { expected: String, actual: String },
}

impl From<hex::FromHexError> for CoreError {
    fn from(e: hex::FromHexError) -> Self {
        CoreError::Encoding(e.to_string())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
