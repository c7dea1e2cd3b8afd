//! Channels: Merkle-signature-backed identities with one-time leaf keys.
//!
//! A channel is an index `(seed, ordinal, depth)`, never a stored graph
//! node. Its id commits to the Merkle root over its `2^depth` leaf
//! public keys together with the announcement verification key, so any
//! message can be checked against the id alone.

use serde::{Deserialize, Serialize};

use crate::crypto::{
    derive_announce_keypair, derive_leaf_keypair, Digest, Keypair, PublicKey,
};
use crate::error::CoreError;
use crate::merkle::{AuthPath, MerkleTree};
use crate::types::{ChannelId, MessageId, Seed};

/// Maximum supported Merkle depth.
///
/// Derivation cost is `2^depth` keypairs per channel, so the range is
/// deliberately small.
pub const MAX_DEPTH: u8 = 16;

const CHANNEL_ID_CONTEXT: &str = "mamgate v0 channel id";
const PACKET_MSG_ID_CONTEXT: &str = "mamgate v0 packet message id";
const ANNOUNCE_MSG_ID_CONTEXT: &str = "mamgate v0 announce message id";

/// One Merkle-signature channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// The channel identifier (and ledger address).
    pub id: ChannelId,
    /// Merkle tree depth; capacity is `2^depth` leaves.
    pub depth: u8,
    /// Position in the channel chain derived from the seed.
    pub ordinal: u64,
    /// The id of the predecessor channel, if any.
    pub parent: Option<ChannelId>,
}

impl Channel {
    /// Number of one-time leaf keys in this channel.
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// The message id a packet on `leaf` would carry.
    pub fn message_id(&self, leaf: u32) -> MessageId {
        derive_message_id(&self.id, leaf)
    }

    /// The message id an announcement bound to `leaf` would carry.
    pub fn announce_message_id(&self, leaf: u32) -> MessageId {
        derive_announce_message_id(&self.id, leaf)
    }
}

/// Derive the packet message id for `(channel, leaf)`.
///
/// This is the ledger tag other peers look for; the used-leaf scan
/// matches observed tags against exactly this derivation.
pub fn derive_message_id(channel: &ChannelId, leaf: u32) -> MessageId {
    let mut hasher = blake3::Hasher::new_derive_key(PACKET_MSG_ID_CONTEXT);
    hasher.update(channel.as_bytes());
    hasher.update(&leaf.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest.as_bytes()[..16]);
    MessageId(bytes)
}

/// Derive the announcement message id for `(channel, leaf)`.
///
/// Separate namespace from packet ids: an announcement never collides
/// with a packet tag, so it cannot shadow a leaf in the used scan.
pub fn derive_announce_message_id(channel: &ChannelId, leaf: u32) -> MessageId {
    let mut hasher = blake3::Hasher::new_derive_key(ANNOUNCE_MSG_ID_CONTEXT);
    hasher.update(channel.as_bytes());
    hasher.update(&leaf.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest.as_bytes()[..16]);
    MessageId(bytes)
}

/// The full key material of one channel, reconstructed from the seed.
///
/// Holds every leaf keypair, the Merkle tree over their public keys and
/// the announcement keypair. Built on demand by writers; readers never
/// need it.
pub struct KeyTree {
    channel: Channel,
    leaves: Vec<Keypair>,
    tree: MerkleTree,
    announce: Keypair,
}

impl KeyTree {
    /// Derive the key tree for `(seed, ordinal, depth)`.
    pub fn derive(
        seed: &Seed,
        ordinal: u64,
        depth: u8,
        parent: Option<ChannelId>,
    ) -> Result<Self, CoreError> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(CoreError::DepthOutOfRange(depth));
        }

        let capacity = 1usize << depth;
        let leaves: Vec<Keypair> = (0..capacity)
            .map(|leaf| derive_leaf_keypair(seed, ordinal, leaf as u32))
            .collect();
        let public_keys: Vec<PublicKey> = leaves.iter().map(Keypair::public_key).collect();
        let tree = MerkleTree::build(&public_keys)?;
        let announce = derive_announce_keypair(seed, ordinal);

        let id = channel_id(&tree.root(), &announce.public_key());
        let channel = Channel {
            id,
            depth,
            ordinal,
            parent,
        };

        Ok(Self {
            channel,
            leaves,
            tree,
            announce,
        })
    }

    /// The channel this tree backs.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// The channel id.
    pub fn id(&self) -> ChannelId {
        self.channel.id
    }

    /// The Merkle root over the leaf public keys.
    pub fn merkle_root(&self) -> Digest {
        self.tree.root()
    }

    /// The announcement verification key.
    pub fn announce_public(&self) -> PublicKey {
        self.announce.public_key()
    }

    /// The announcement signing keypair.
    pub fn announce_keypair(&self) -> &Keypair {
        &self.announce
    }

    /// The keypair for `leaf`.
    pub fn leaf_keypair(&self, leaf: u32) -> Result<&Keypair, CoreError> {
        self.leaves
            .get(leaf as usize)
            .ok_or(CoreError::LeafOutOfRange {
                leaf,
                capacity: self.channel.capacity(),
            })
    }

    /// The authentication path for `leaf`.
    pub fn auth_path(&self, leaf: u32) -> Result<AuthPath, CoreError> {
        self.tree.auth_path(leaf)
    }
}

/// Compute a channel id from its Merkle root and announcement key.
pub fn channel_id(merkle_root: &Digest, announce_public: &PublicKey) -> ChannelId {
    let mut hasher = blake3::Hasher::new_derive_key(CHANNEL_ID_CONTEXT);
    hasher.update(merkle_root.as_bytes());
    hasher.update(announce_public.as_bytes());
    ChannelId(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: Seed = Seed::from_bytes([0x42; 32]);

    #[test]
    fn test_key_tree_deterministic() {
        let a = KeyTree::derive(&SEED, 0, 2, None).unwrap();
        let b = KeyTree::derive(&SEED, 0, 2, None).unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(a.merkle_root(), b.merkle_root());
    }

    #[test]
    fn test_distinct_ordinals_distinct_ids() {
        let a = KeyTree::derive(&SEED, 0, 2, None).unwrap();
        let b = KeyTree::derive(&SEED, 1, 2, None).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_distinct_depths_distinct_ids() {
        let a = KeyTree::derive(&SEED, 0, 1, None).unwrap();
        let b = KeyTree::derive(&SEED, 0, 2, None).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_depth_bounds() {
        assert!(KeyTree::derive(&SEED, 0, 0, None).is_err());
        assert!(KeyTree::derive(&SEED, 0, MAX_DEPTH + 1, None).is_err());
    }

    #[test]
    fn test_capacity() {
        let tree = KeyTree::derive(&SEED, 0, 3, None).unwrap();
        assert_eq!(tree.channel().capacity(), 8);
        assert!(tree.leaf_keypair(7).is_ok());
        assert!(tree.leaf_keypair(8).is_err());
    }

    #[test]
    fn test_message_ids_distinct_per_leaf() {
        let tree = KeyTree::derive(&SEED, 0, 2, None).unwrap();
        let channel = tree.channel();

        let ids: Vec<MessageId> = (0..4).map(|leaf| channel.message_id(leaf)).collect();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                assert_ne!(ids[i], ids[j]);
            }
        }
    }

    #[test]
    fn test_announce_ids_do_not_collide_with_packet_ids() {
        let tree = KeyTree::derive(&SEED, 0, 2, None).unwrap();
        let channel = tree.channel();

        for leaf in 0..4 {
            assert_ne!(channel.message_id(leaf), channel.announce_message_id(leaf));
        }
    }

    #[test]
    fn test_auth_path_matches_commitment() {
        let tree = KeyTree::derive(&SEED, 0, 2, None).unwrap();
        let leaf = 3;
        let pk = tree.leaf_keypair(leaf).unwrap().public_key();
        let path = tree.auth_path(leaf).unwrap();

        let root = path.root_for(&pk, leaf);
        assert_eq!(root, tree.merkle_root());
        assert_eq!(channel_id(&root, &tree.announce_public()), tree.id());
    }
}
