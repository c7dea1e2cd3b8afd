//! The engine's snapshot: the one piece of durable local state.
//!
//! A single CBOR file holding the secret seed and the trusted channel
//! set. Read at startup, rewritten after each send/receive that used
//! the engine's own seed; calls that supply their own seed skip
//! snapshot I/O entirely.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use mamgate_core::{canonical, ChannelId, Seed};

use crate::error::Result;

/// The persisted engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// The secret seed all channels derive from.
    pub seed: Seed,
    /// Channels whose messages this engine accepts.
    pub trusted: BTreeSet<ChannelId>,
}

impl EngineSnapshot {
    /// A fresh snapshot around a seed.
    pub fn new(seed: Seed) -> Self {
        Self {
            seed,
            trusted: BTreeSet::new(),
        }
    }

    /// Load a snapshot; `Ok(None)` when the file does not exist yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(canonical::from_bytes(&bytes)?))
    }

    /// Write the snapshot, replacing any previous one atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = canonical::to_bytes(self)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
