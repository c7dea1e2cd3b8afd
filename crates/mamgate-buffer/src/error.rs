//! Error types for the buffer module.

use thiserror::Error;

/// Errors from the shared cache and the publish buffer.
///
/// Losing track of a buffered request risks key reuse (MAM) or an
/// unconfirmed transfer, so queue failures are always surfaced, never
/// swallowed.
#[derive(Debug, Error)]
pub enum BufferError {
    /// The coordination lock is held; transient, the caller may retry.
    #[error("buffer lock busy")]
    LockBusy,

    /// The underlying cache service failed.
    #[error("cache error: {0}")]
    Cache(String),

    /// A queued UUID has no matching cache entry.
    #[error("missing entry for {0}")]
    MissingEntry(String),

    /// A queue held bytes that do not parse as a UUID.
    #[error("corrupt queue entry: {0}")]
    CorruptEntry(String),
}

/// Result type for buffer operations.
pub type Result<T> = std::result::Result<T, BufferError>;
