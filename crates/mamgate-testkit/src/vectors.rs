//! Derivation vectors.
//!
//! A fixed matrix of (seed, ordinal, depth) positions used to pin down
//! the derivation scheme: every position must yield a stable channel
//! id, and no two positions may ever collide. Any change to the key
//! or id derivation shows up here first.

use mamgate_core::{ChannelId, KeyTree, Seed};

/// One derivation vector: a position in some seed's channel chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationVector {
    /// Human-readable vector name.
    pub name: &'static str,
    /// Seed byte (the full seed repeats it).
    pub seed_byte: u8,
    /// Chain position.
    pub ordinal: u64,
    /// Merkle depth.
    pub depth: u8,
}

/// The fixed vector matrix.
pub fn all_vectors() -> Vec<DerivationVector> {
    vec![
        DerivationVector { name: "first-shallow", seed_byte: 0x01, ordinal: 0, depth: 1 },
        DerivationVector { name: "first-deep", seed_byte: 0x01, ordinal: 0, depth: 4 },
        DerivationVector { name: "second-shallow", seed_byte: 0x01, ordinal: 1, depth: 1 },
        DerivationVector { name: "chain-tail", seed_byte: 0x01, ordinal: 7, depth: 2 },
        DerivationVector { name: "other-seed", seed_byte: 0x02, ordinal: 0, depth: 1 },
        DerivationVector { name: "other-seed-deep", seed_byte: 0x02, ordinal: 3, depth: 3 },
    ]
}

/// Derive the channel id for a vector.
pub fn derive_vector(vector: &DerivationVector) -> ChannelId {
    let seed = Seed::from_bytes([vector.seed_byte; 32]);
    KeyTree::derive(&seed, vector.ordinal, vector.depth, None)
        .expect("vector depths are valid")
        .id()
}

/// Check stability and pairwise distinctness of the whole matrix.
///
/// Returns the offending vector names on failure.
pub fn verify_all_vectors() -> Result<(), Vec<&'static str>> {
    let vectors = all_vectors();
    let mut bad = Vec::new();

    let ids: Vec<ChannelId> = vectors.iter().map(derive_vector).collect();
    for (i, vector) in vectors.iter().enumerate() {
        // Stable across repeated derivation.
        if derive_vector(vector) != ids[i] {
            bad.push(vector.name);
            continue;
        }
        // Distinct from every other position.
        if ids.iter().enumerate().any(|(j, id)| j != i && *id == ids[i]) {
            bad.push(vector.name);
        }
    }

    if bad.is_empty() {
        Ok(())
    } else {
        Err(bad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_verify() {
        assert_eq!(verify_all_vectors(), Ok(()));
    }

    #[test]
    fn test_vector_ids_are_addresses() {
        for vector in all_vectors() {
            let id = derive_vector(&vector);
            assert_eq!(id.address().as_bytes(), id.as_bytes());
        }
    }
}
