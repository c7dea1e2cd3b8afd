//! Proptest generators for property-based testing.

use proptest::prelude::*;

use mamgate_core::{ChannelId, MessageId, Seed};
use mamgate_mask::{EncryptionKeySet, PreSharedKey, PskId, RecipientSecret};

/// Generate a random seed.
pub fn seed() -> impl Strategy<Value = Seed> {
    any::<[u8; 32]>().prop_map(Seed::from_bytes)
}

/// Generate a random channel id (not derived from any seed).
pub fn channel_id() -> impl Strategy<Value = ChannelId> {
    any::<[u8; 32]>().prop_map(ChannelId::from_bytes)
}

/// Generate a random message id.
pub fn message_id() -> impl Strategy<Value = MessageId> {
    any::<[u8; 16]>().prop_map(MessageId::from_bytes)
}

/// Generate a practical channel depth (kept small: key derivation is
/// exponential in depth).
pub fn depth() -> impl Strategy<Value = u8> {
    1u8..=4
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate an encryption key set: public, PSK-restricted,
/// recipient-restricted, or both.
pub fn key_set() -> impl Strategy<Value = EncryptionKeySet> {
    (
        prop::collection::vec(any::<([u8; 16], [u8; 32])>(), 0..=2),
        0usize..=2,
    )
        .prop_map(|(psks, recipients)| {
            let mut set = EncryptionKeySet::new();
            for (id, key) in psks {
                set = set.with_psk(PskId::from_bytes(id), PreSharedKey::from_bytes(key));
            }
            for _ in 0..recipients {
                let secret = RecipientSecret::generate();
                set = set.with_recipient(secret.public_key()).with_secret(secret);
            }
            set
        })
}
