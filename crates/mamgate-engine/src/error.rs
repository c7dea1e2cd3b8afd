//! Error types for the channel engine.

use thiserror::Error;

use mamgate_core::{ChannelId, CoreError, MessageId};
use mamgate_ledger::LedgerError;
use mamgate_mask::MaskError;

/// Errors from the resolver, packer and publish protocol.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The desired channel id was not reached within the search bound.
    #[error("exceeded channel search bound of {bound}")]
    ExceededSearchBound { bound: u64 },

    /// Every leaf in the channel was tried without finding a free one.
    #[error("all keys in the channel are used")]
    AllKeysUsed,

    /// `write_packet` was called for a message id with no prior header.
    #[error("no header written for message {0}")]
    UnknownMessageId(MessageId),

    /// The bundle's channel is not in the trusted set.
    #[error("channel {0} is not trusted")]
    UntrustedChannel(ChannelId),

    /// Malformed or inconsistent bundle content.
    #[error("read error: {0}")]
    Read(String),

    /// A receive call named neither a channel nor a bundle hash.
    #[error("receive needs a channel id or a bundle hash")]
    EmptyReceiveRequest,

    /// Snapshot file I/O failed.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Mask(#[from] MaskError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
