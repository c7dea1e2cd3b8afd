//! Wire structures carried inside a channel bundle.
//!
//! A bundle's content is the CBOR header followed, for packets, by the
//! CBOR packet section. The boundary is recovered on read by
//! re-encoding the parsed header: encoding is deterministic, so the
//! re-encoded length equals the original.

use serde::{Deserialize, Serialize};

use mamgate_core::{
    AuthPath, ChannelId, Digest, MessageId, OneTimeSignature, PublicKey,
};
use mamgate_mask::{MaskedPayload, SessionKeyWrap};

/// The current message schema version.
pub const MESSAGE_VERSION: u8 = 0;

/// The header of a channel message.
///
/// Carries everything a reader needs to check the channel commitment
/// and recover the session key. An announcement is a header whose
/// `next_channel` names the successor, signed with the announcement
/// key committed into the channel id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Schema version (currently 0).
    pub version: u8,

    /// The channel this message belongs to.
    pub channel: ChannelId,

    /// The leaf ordinal this message is bound to.
    pub leaf: u32,

    /// The message id; must match the bundle's transaction tag.
    pub message_id: MessageId,

    /// Merkle root over the channel's leaf public keys.
    pub merkle_root: Digest,

    /// The channel's announcement verification key.
    pub announce_public: PublicKey,

    /// Session-key wraps, one per key in the writer's set. Empty for
    /// public-mode messages.
    pub wraps: Vec<SessionKeyWrap>,

    /// The successor channel, present only on announcements.
    pub next_channel: Option<ChannelId>,

    /// Announcement signature over (channel, next_channel, message_id).
    pub announce_sig: Option<OneTimeSignature>,
}

impl MessageHeader {
    /// The context binding session-key wraps to this message.
    pub fn wrap_context(&self) -> Vec<u8> {
        wrap_context(&self.channel, &self.message_id)
    }

    /// Whether this header announces a successor channel.
    pub fn is_announcement(&self) -> bool {
        self.next_channel.is_some()
    }
}

/// The terminal packet section: masked payload plus the one-time
/// signature tying it to a channel leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketSection {
    /// The encrypted payload.
    pub masked: MaskedPayload,

    /// Public key of the signing leaf.
    pub leaf_public: PublicKey,

    /// Authentication path from the leaf to the channel's Merkle root.
    pub auth_path: AuthPath,

    /// Signature over (header bytes || masked payload bytes).
    pub signature: OneTimeSignature,

    /// Marks the final packet of the message.
    pub last: bool,
}

/// Build the wrap-derivation context for `(channel, message)`.
pub fn wrap_context(channel: &ChannelId, message_id: &MessageId) -> Vec<u8> {
    let mut context = Vec::with_capacity(32 + 16);
    context.extend_from_slice(channel.as_bytes());
    context.extend_from_slice(message_id.as_bytes());
    context
}

/// Build the byte string an announcement signature covers.
pub fn announce_signing_message(
    channel: &ChannelId,
    next_channel: &ChannelId,
    message_id: &MessageId,
) -> Vec<u8> {
    let mut message = Vec::with_capacity(19 + 32 + 32 + 16);
    message.extend_from_slice(b"mamgate v0 announce");
    message.extend_from_slice(channel.as_bytes());
    message.extend_from_slice(next_channel.as_bytes());
    message.extend_from_slice(message_id.as_bytes());
    message
}

/// Build the byte string a packet's leaf signature covers.
pub fn packet_signing_message(header_bytes: &[u8], masked_bytes: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(header_bytes.len() + masked_bytes.len());
    message.extend_from_slice(header_bytes);
    message.extend_from_slice(masked_bytes);
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use mamgate_core::canonical;

    fn sample_header(next: Option<ChannelId>) -> MessageHeader {
        MessageHeader {
            version: MESSAGE_VERSION,
            channel: ChannelId::from_bytes([1; 32]),
            leaf: 3,
            message_id: MessageId::from_bytes([2; 16]),
            merkle_root: Digest::from_bytes([3; 32]),
            announce_public: PublicKey::from_bytes([4; 32]),
            wraps: Vec::new(),
            next_channel: next,
            announce_sig: None,
        }
    }

    #[test]
    fn test_header_cbor_roundtrip() {
        let header = sample_header(Some(ChannelId::from_bytes([9; 32])));
        let bytes = canonical::to_bytes(&header).unwrap();
        let recovered: MessageHeader = canonical::from_bytes(&bytes).unwrap();
        assert_eq!(header, recovered);
    }

    #[test]
    fn test_header_reencoding_finds_boundary() {
        let header = sample_header(None);
        let header_bytes = canonical::to_bytes(&header).unwrap();

        let mut content = header_bytes.clone();
        content.extend_from_slice(b"trailing packet bytes");

        let parsed: MessageHeader = canonical::from_bytes(&content).unwrap();
        assert_eq!(canonical::to_bytes(&parsed).unwrap().len(), header_bytes.len());
    }

    #[test]
    fn test_wrap_context_distinct_per_message() {
        let a = wrap_context(&ChannelId::from_bytes([1; 32]), &MessageId::from_bytes([1; 16]));
        let b = wrap_context(&ChannelId::from_bytes([1; 32]), &MessageId::from_bytes([2; 16]));
        assert_ne!(a, b);
    }

    #[test]
    fn test_announcement_flag() {
        assert!(!sample_header(None).is_announcement());
        assert!(sample_header(Some(ChannelId::ZERO)).is_announcement());
    }
}
