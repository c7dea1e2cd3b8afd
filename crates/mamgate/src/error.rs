//! Error types for the gateway.

use thiserror::Error;

use mamgate_buffer::BufferError;
use mamgate_core::CoreError;
use mamgate_engine::EngineError;
use mamgate_ledger::LedgerError;

/// Top-level gateway errors, one variant per subsystem so front ends
/// can map them to user-visible statuses.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
