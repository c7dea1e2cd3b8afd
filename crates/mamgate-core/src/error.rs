//! Error types for mamgate core primitives.

use thiserror::Error;

/// Errors from pure channel, bundle and crypto operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("channel depth {0} out of range (1..=16)")]
    DepthOutOfRange(u8),

    #[error("leaf {leaf} out of range for capacity {capacity}")]
    LeafOutOfRange { leaf: u32, capacity: u64 },

    #[error("merkle tree needs a power-of-two leaf count, got {0}")]
    InvalidLeafCount(usize),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),
}
