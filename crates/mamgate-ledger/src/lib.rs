//! # mamgate ledger
//!
//! The ledger boundary of mamgate: the [`LedgerClient`] trait the engine
//! consumes (find / broadcast / fetch), plus [`MemoryLedger`], an
//! in-memory implementation with scripted failures for tests.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::LedgerError;
pub use memory::MemoryLedger;
pub use traits::LedgerClient;
