//! Message packer / unpacker.
//!
//! `BundleWriter` turns (leaf, keys, payload) into ledger bundles;
//! `read_bundle` turns a fetched bundle back into a payload or a
//! discovered successor channel. Fragment chunking is a bundle concern
//! and invisible here.

use std::collections::BTreeSet;
use std::collections::HashMap;

use mamgate_core::{canonical, channel_id, Bundle, Channel, ChannelId, KeyTree, MessageId, Seed};
use mamgate_mask::{EncryptionKeySet, MaskedPayload, SessionKey};

use crate::error::{EngineError, Result};
use crate::message::{
    announce_signing_message, packet_signing_message, wrap_context, MessageHeader, PacketSection,
    MESSAGE_VERSION,
};

/// Session state between a header write and its packet write.
struct PendingMessage {
    leaf: u32,
    session: SessionKey,
    header_bytes: Vec<u8>,
}

/// Writes headers, packets and announcements for one channel.
///
/// Holds the channel's full key material; sessions opened by
/// `write_header` are consumed by the matching `write_packet`.
pub struct BundleWriter {
    tree: KeyTree,
    pending: HashMap<MessageId, PendingMessage>,
}

impl BundleWriter {
    /// Derive a writer for `channel` from the seed.
    pub fn derive(seed: &Seed, channel: &Channel) -> Result<Self> {
        let tree = KeyTree::derive(seed, channel.ordinal, channel.depth, channel.parent)?;
        Ok(Self {
            tree,
            pending: HashMap::new(),
        })
    }

    /// The channel this writer signs for.
    pub fn channel(&self) -> &Channel {
        self.tree.channel()
    }

    /// Bind a fresh bundle to `leaf` and write the header transactions.
    ///
    /// The returned message id is the tag peers will look for. The
    /// bundle is not finalized yet; `write_packet` completes it.
    pub fn write_header(
        &mut self,
        leaf: u32,
        keys: &EncryptionKeySet,
    ) -> Result<(Bundle, MessageId)> {
        let channel = self.tree.channel().clone();
        let message_id = channel.message_id(leaf);
        // The leaf keypair lookup doubles as the range check.
        self.tree.leaf_keypair(leaf)?;

        let context = wrap_context(&channel.id, &message_id);
        let session = if keys.is_public() {
            SessionKey::public_mode(&context)
        } else {
            SessionKey::generate()
        };
        let wraps = keys.wrap_session(&session, &context)?;

        let header = MessageHeader {
            version: MESSAGE_VERSION,
            channel: channel.id,
            leaf,
            message_id,
            merkle_root: self.tree.merkle_root(),
            announce_public: self.tree.announce_public(),
            wraps,
            next_channel: None,
            announce_sig: None,
        };
        let header_bytes = canonical::to_bytes(&header)?;

        let mut bundle = Bundle::new();
        bundle.push_message(channel.id.address(), message_id, &header_bytes);

        self.pending.insert(
            message_id,
            PendingMessage {
                leaf,
                session,
                header_bytes,
            },
        );

        Ok((bundle, message_id))
    }

    /// Append the masked, signed payload as the terminal packet and
    /// finalize the bundle.
    pub fn write_packet(
        &mut self,
        mut bundle: Bundle,
        message_id: MessageId,
        payload: &[u8],
    ) -> Result<Bundle> {
        let pending = self
            .pending
            .remove(&message_id)
            .ok_or(EngineError::UnknownMessageId(message_id))?;

        let masked = MaskedPayload::seal(payload, &pending.session)?;
        let masked_bytes = canonical::to_bytes(&masked)?;

        let keypair = self.tree.leaf_keypair(pending.leaf)?;
        let signature =
            keypair.sign(&packet_signing_message(&pending.header_bytes, &masked_bytes));

        let packet = PacketSection {
            masked,
            leaf_public: keypair.public_key(),
            auth_path: self.tree.auth_path(pending.leaf)?,
            signature,
            last: true,
        };

        bundle.push_message(
            self.tree.id().address(),
            message_id,
            &canonical::to_bytes(&packet)?,
        );
        bundle.finalize();
        Ok(bundle)
    }

    /// Write an announcement bundle naming `next` as this channel's
    /// successor.
    ///
    /// Same shape as a header write, but signed with the announcement
    /// key and tagged in the announcement id namespace; it does not
    /// consume a signing leaf.
    pub fn write_announcement(
        &self,
        leaf: u32,
        keys: &EncryptionKeySet,
        next: &Channel,
    ) -> Result<Bundle> {
        let channel = self.tree.channel().clone();
        let message_id = channel.announce_message_id(leaf);

        let context = wrap_context(&channel.id, &message_id);
        let session = if keys.is_public() {
            SessionKey::public_mode(&context)
        } else {
            SessionKey::generate()
        };
        let wraps = keys.wrap_session(&session, &context)?;

        let signature = self
            .tree
            .announce_keypair()
            .sign(&announce_signing_message(&channel.id, &next.id, &message_id));

        let header = MessageHeader {
            version: MESSAGE_VERSION,
            channel: channel.id,
            leaf,
            message_id,
            merkle_root: self.tree.merkle_root(),
            announce_public: self.tree.announce_public(),
            wraps,
            next_channel: Some(next.id),
            announce_sig: Some(signature),
        };

        let mut bundle = Bundle::new();
        bundle.push_message(
            channel.id.address(),
            message_id,
            &canonical::to_bytes(&header)?,
        );
        bundle.finalize();
        Ok(bundle)
    }
}

/// Decode a bundle back into a payload or an announcement.
///
/// Returns `Ok(None)` for header- or announcement-only bundles (an
/// announcement additionally inserts the successor into `trusted`).
/// Fails only on malformed, unverifiable or undecryptable input.
pub fn read_bundle(
    bundle: &Bundle,
    keys: &EncryptionKeySet,
    trusted: &mut BTreeSet<ChannelId>,
) -> Result<Option<Vec<u8>>> {
    let tags = bundle.tags();
    let tag = tags
        .first()
        .ok_or_else(|| EngineError::Read("empty bundle".into()))?;
    let content = bundle.content_for_tag(tag);

    let header: MessageHeader = canonical::from_bytes(&content)
        .map_err(|e| EngineError::Read(format!("malformed header: {e}")))?;

    if header.version != MESSAGE_VERSION {
        return Err(EngineError::Read(format!(
            "unsupported message version {}",
            header.version
        )));
    }
    if &header.message_id != tag {
        return Err(EngineError::Read("header id does not match bundle tag".into()));
    }
    // The id must commit to the carried root and announcement key.
    if channel_id(&header.merkle_root, &header.announce_public) != header.channel {
        return Err(EngineError::Read("channel commitment mismatch".into()));
    }
    if !trusted.contains(&header.channel) {
        return Err(EngineError::UntrustedChannel(header.channel));
    }

    if let Some(next) = header.next_channel {
        let signature = header
            .announce_sig
            .ok_or_else(|| EngineError::Read("announcement without signature".into()))?;
        if header.message_id
            != mamgate_core::derive_announce_message_id(&header.channel, header.leaf)
        {
            return Err(EngineError::Read("announcement tag mismatch".into()));
        }
        header
            .announce_public
            .verify(
                &announce_signing_message(&header.channel, &next, &header.message_id),
                &signature,
            )
            .map_err(|_| EngineError::Read("announcement signature invalid".into()))?;

        tracing::debug!(channel = %header.channel, next = %next, "discovered successor channel");
        trusted.insert(next);
        return Ok(None);
    }

    if header.message_id != mamgate_core::derive_message_id(&header.channel, header.leaf) {
        return Err(EngineError::Read("packet tag mismatch".into()));
    }

    let header_len = canonical::to_bytes(&header)?.len();
    if content.len() == header_len {
        // Header-only bundle: no payload present, not an error.
        return Ok(None);
    }

    let packet: PacketSection = canonical::from_bytes(&content[header_len..])
        .map_err(|e| EngineError::Read(format!("malformed packet: {e}")))?;

    if packet.auth_path.root_for(&packet.leaf_public, header.leaf) != header.merkle_root {
        return Err(EngineError::Read("leaf not in channel tree".into()));
    }

    let masked_bytes = canonical::to_bytes(&packet.masked)?;
    packet
        .leaf_public
        .verify(
            &packet_signing_message(&content[..header_len], &masked_bytes),
            &packet.signature,
        )
        .map_err(|_| EngineError::Read("packet signature invalid".into()))?;

    let session = keys.unwrap_session(&header.wraps, &header.wrap_context())?;
    let payload = packet.masked.open(&session)?;
    Ok(Some(payload))
}
