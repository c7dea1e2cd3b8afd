//! Error types for the ledger module.

use thiserror::Error;

/// Errors crossing the ledger boundary.
///
/// At the publish boundary these convert into buffering, not
/// propagation; everywhere else they surface to the caller.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Broadcasting a bundle failed (node unreachable, rejected, ...).
    #[error("broadcast failed: {0}")]
    Broadcast(String),

    /// A query against the ledger failed.
    #[error("query failed: {0}")]
    Query(String),

    /// The requested object does not exist on the ledger.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
