//! Merkle tree over a channel's leaf public keys.
//!
//! The root (together with the announcement key) is what a channel id
//! commits to. Packets carry an authentication path so a reader can
//! check that the signing leaf belongs to the channel without knowing
//! any other leaf.

use serde::{Deserialize, Serialize};

use crate::crypto::{Digest, PublicKey};
use crate::error::CoreError;

const MERKLE_LEAF_CONTEXT: &str = "mamgate v0 merkle leaf";
const MERKLE_NODE_CONTEXT: &str = "mamgate v0 merkle node";

/// Hash a leaf public key into the tree.
fn leaf_digest(pk: &PublicKey) -> Digest {
    let mut hasher = blake3::Hasher::new_derive_key(MERKLE_LEAF_CONTEXT);
    hasher.update(pk.as_bytes());
    Digest(*hasher.finalize().as_bytes())
}

/// Hash two child digests into their parent.
fn node_digest(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = blake3::Hasher::new_derive_key(MERKLE_NODE_CONTEXT);
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Digest(*hasher.finalize().as_bytes())
}

/// A complete binary Merkle tree over `2^depth` leaf public keys.
///
/// Levels are stored bottom-up: `levels[0]` are the leaf digests,
/// `levels[depth]` is the single root.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Build a tree from leaf public keys. The count must be a power of two.
    pub fn build(leaves: &[PublicKey]) -> Result<Self, CoreError> {
        if leaves.is_empty() || !leaves.len().is_power_of_two() {
            return Err(CoreError::InvalidLeafCount(leaves.len()));
        }

        let mut levels = vec![leaves.iter().map(leaf_digest).collect::<Vec<_>>()];
        while levels[levels.len() - 1].len() > 1 {
            let prev = &levels[levels.len() - 1];
            let next: Vec<Digest> = prev
                .chunks(2)
                .map(|pair| node_digest(&pair[0], &pair[1]))
                .collect();
            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// The root digest.
    pub fn root(&self) -> Digest {
        self.levels[self.levels.len() - 1][0]
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// The authentication path for the leaf at `index`.
    pub fn auth_path(&self, index: u32) -> Result<AuthPath, CoreError> {
        let mut idx = index as usize;
        if idx >= self.leaf_count() {
            return Err(CoreError::LeafOutOfRange {
                leaf: index,
                capacity: self.leaf_count() as u64,
            });
        }

        let mut siblings = Vec::with_capacity(self.levels.len() - 1);
        for level in &self.levels[..self.levels.len() - 1] {
            siblings.push(level[idx ^ 1]);
            idx >>= 1;
        }

        Ok(AuthPath { siblings })
    }
}

/// Sibling digests from a leaf up to (but excluding) the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPath {
    /// Bottom-up sibling digests.
    pub siblings: Vec<Digest>,
}

impl AuthPath {
    /// Recompute the root for `pk` sitting at `index`.
    ///
    /// The result must be compared against the committed root by the
    /// caller; a mismatch means the leaf is not part of the channel.
    pub fn root_for(&self, pk: &PublicKey, index: u32) -> Digest {
        let mut digest = leaf_digest(pk);
        let mut idx = index as usize;
        for sibling in &self.siblings {
            digest = if idx & 1 == 0 {
                node_digest(&digest, sibling)
            } else {
                node_digest(sibling, &digest)
            };
            idx >>= 1;
        }
        digest
    }

    /// The depth of the tree this path belongs to.
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }
}
