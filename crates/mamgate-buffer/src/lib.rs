//! # mamgate buffer
//!
//! The reliable-publish layer: a [`CacheStore`] trait over the external
//! shared cache/queue service, an in-memory implementation for tests,
//! and the [`PublishBuffer`] that defers publish requests under
//! generated UUIDs until a retry daemon completes them.

pub mod buffer;
pub mod error;
pub mod memory;
pub mod traits;

pub use buffer::{PublishBuffer, QueueNames, RequestKind, RequestStatus};
pub use error::BufferError;
pub use memory::MemoryCache;
pub use traits::CacheStore;
