//! # mamgate
//!
//! A gateway core that lets ordinary clients publish and subscribe to
//! authenticated, optionally encrypted message streams carried as
//! transactions on an append-only, tip-based ledger, while shielding
//! them from the ledger's eventual consistency and node availability.
//!
//! The [`Gateway`] wires the channel engine to the reliable publish
//! buffer: MAM sends are buffered under a UUID and executed by the
//! retry daemon ([`Gateway::tick`]); plain bundle sends fall back to
//! the buffer on broadcast failure; receives hit the ledger directly.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use mamgate::{Gateway, GatewayConfig, SendMessageRequest};
//! # use mamgate_buffer::MemoryCache;
//! # use mamgate_ledger::MemoryLedger;
//! # use mamgate_mask::EncryptionKeySet;
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Gateway::new(
//!     Arc::new(MemoryLedger::new()),
//!     Arc::new(MemoryCache::new()),
//!     GatewayConfig::default(),
//! )
//! .await?;
//!
//! let queued = gateway
//!     .send_message(&SendMessageRequest {
//!         seed: None,
//!         channel_id: None,
//!         depth: Some(2),
//!         payload: b"hello".to_vec(),
//!         keys: EncryptionKeySet::new(),
//!     })
//!     .await?;
//!
//! gateway.tick().await?; // normally driven by a periodic task
//! let _status = gateway.fetch_status(&queued.uuid.unwrap()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod daemon;
pub mod error;
pub mod gateway;
pub mod requests;

pub use config::GatewayConfig;
pub use daemon::TickReport;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use requests::{
    ReceiveMessageRequest, ReceiveMessageResponse, SendBundleResponse, SendMessageRequest,
    SendMessageResponse, StatusResponse,
};
