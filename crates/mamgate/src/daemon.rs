//! The retry daemon: drains the publish buffer.
//!
//! Invoked by an external periodic task; one `tick` re-broadcasts
//! buffered bundles, replays buffered MAM requests through the publish
//! protocol, and trims the done queues. The daemon owns unbounded
//! retrying: a request that still fails simply stays pending for the
//! next tick.

use mamgate_buffer::{BufferError, CacheStore, RequestKind};
use mamgate_core::{canonical, Bundle};
use mamgate_engine::PublishRequest;
use mamgate_ledger::LedgerClient;

use crate::error::Result;
use crate::gateway::Gateway;
use crate::requests::{SendMessageRequest, SendMessageResponse};

/// What one daemon tick accomplished.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Buffered bundles successfully broadcast.
    pub bundles_broadcast: usize,
    /// Buffered MAM requests successfully published.
    pub mam_published: usize,
    /// Done-queue entries evicted by capacity trimming.
    pub done_trimmed: usize,
}

impl<L: LedgerClient, C: CacheStore> Gateway<L, C> {
    /// Run one daemon pass over both pending queues.
    pub async fn tick(&self) -> Result<TickReport> {
        let mut report = TickReport::default();

        report.bundles_broadcast = self.drain_buffered_bundles().await?;
        report.mam_published = self.drain_buffered_mam().await?;
        report.done_trimmed = self
            .buffer
            .trim_done(RequestKind::Txn, self.config.done_capacity)
            .await?
            + self
                .buffer
                .trim_done(RequestKind::Mam, self.config.done_capacity)
                .await?;

        Ok(report)
    }

    /// Re-broadcast buffered bundles until the queue is empty or a
    /// broadcast fails (the failing entry stays pending).
    async fn drain_buffered_bundles(&self) -> Result<usize> {
        let mut count = 0;
        while let Some(uuid) = self.buffer.peek_pending(RequestKind::Txn).await? {
            let payload = self
                .buffer
                .payload(&uuid)
                .await?
                .ok_or_else(|| BufferError::MissingEntry(uuid.to_string()))?;
            let bundle: Bundle = canonical::from_bytes(&payload)?;

            if let Err(e) = self.ledger.broadcast(&bundle).await {
                tracing::warn!(%uuid, error = %e, "buffered bundle broadcast failed, keeping pending");
                break;
            }

            // Rewrite the entry with the broadcast bundle so the status
            // read returns the final content.
            self.buffer
                .complete(RequestKind::Txn, &uuid, &payload)
                .await?;
            tracing::debug!(%uuid, "buffered bundle broadcast");
            count += 1;
        }
        Ok(count)
    }

    /// Replay buffered MAM requests through the publish protocol.
    async fn drain_buffered_mam(&self) -> Result<usize> {
        let mut count = 0;
        while let Some(uuid) = self.buffer.peek_pending(RequestKind::Mam).await? {
            let payload = self
                .buffer
                .payload(&uuid)
                .await?
                .ok_or_else(|| BufferError::MissingEntry(uuid.to_string()))?;
            let req: SendMessageRequest = canonical::from_bytes(&payload)?;

            let publish_req = PublishRequest {
                seed: req.seed.unwrap_or(self.seed),
                depth: req.depth.unwrap_or(self.config.default_depth),
                channel_id: req.channel_id,
                payload: req.payload.clone(),
                keys: req.keys.clone(),
            };

            let outcome = match self.engine.publish(&publish_req).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(%uuid, error = %e, "buffered MAM publish failed, keeping pending");
                    break;
                }
            };

            let response = SendMessageResponse {
                uuid: None,
                channel_id: Some(outcome.channel_id),
                message_id: Some(outcome.message_id),
                bundle_hash: Some(outcome.bundle_hash),
                next_channel_id: outcome.announcement.as_ref().map(|a| a.next_channel),
                announcement_bundle_hash: outcome.announcement.as_ref().map(|a| a.bundle_hash),
            };
            self.buffer
                .complete(RequestKind::Mam, &uuid, &canonical::to_bytes(&response)?)
                .await?;
            tracing::debug!(%uuid, channel = %outcome.channel_id, "buffered MAM request published");

            // The snapshot seed produced new ledger state; persist the
            // trusted set. Per-call seeds skip snapshot I/O.
            if req.seed.is_none() {
                self.save_snapshot().await?;
            }
            count += 1;
        }
        Ok(count)
    }
}
