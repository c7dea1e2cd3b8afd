//! Error types for the masking module.

use thiserror::Error;

/// Errors from key wrapping and payload masking.
#[derive(Debug, Error)]
pub enum MaskError {
    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("decryption error: {0}")]
    Decryption(String),

    #[error("no key in the set can unwrap the session key")]
    NoMatchingKey,

    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for masking operations.
pub type Result<T> = std::result::Result<T, MaskError>;
