//! Gateway configuration.

use std::path::PathBuf;
use std::time::Duration;

use mamgate_buffer::QueueNames;
use mamgate_engine::DEFAULT_SEARCH_BOUND;

/// Configuration for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Channel depth used when a send request does not specify one.
    pub default_depth: u8,

    /// Bound on channel-id search and exhausted-channel restarts.
    pub chid_search_bound: u64,

    /// TTL for buffered request entries; `None` keeps them until done.
    pub cache_ttl: Option<Duration>,

    /// Names of the pending/done queues in the shared cache.
    pub queues: QueueNames,

    /// Where the engine snapshot lives; `None` disables snapshot I/O.
    pub snapshot_path: Option<PathBuf>,

    /// Completed requests retained per done queue before the daemon
    /// evicts the oldest.
    pub done_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_depth: 3,
            chid_search_bound: DEFAULT_SEARCH_BOUND,
            cache_ttl: Some(Duration::from_secs(24 * 60 * 60)),
            queues: QueueNames::default(),
            snapshot_path: None,
            done_capacity: 1024,
        }
    }
}
