//! Bundles: groups of transactions that together carry one message.
//!
//! A transaction holds at most [`FRAGMENT_CAPACITY`] bytes of content;
//! longer messages are chunked across consecutive transactions and
//! reassembled by tag. Chunking lives here so the packer can treat
//! message content as opaque bytes of any length.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::types::{Address, BundleHash, MessageId};

/// Fixed content capacity of one transaction fragment.
pub const FRAGMENT_CAPACITY: usize = 1296;

/// One ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// The address this transaction is posted to.
    pub address: Address,
    /// The message tag; what the used-leaf scan matches against.
    pub tag: MessageId,
    /// Hash of the bundle this transaction belongs to.
    pub bundle: BundleHash,
    /// Position within the bundle.
    pub index: u32,
    /// Index of the bundle's final transaction.
    pub last_index: u32,
    /// The content fragment, at most [`FRAGMENT_CAPACITY`] bytes.
    pub fragment: Bytes,
}

/// An ordered group of transactions forming one atomic message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    transactions: Vec<Transaction>,
}

impl Bundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self {
            transactions: Vec::new(),
        }
    }

    /// Rebuild a bundle from fetched transactions, restoring index order.
    pub fn from_transactions(mut transactions: Vec<Transaction>) -> Self {
        transactions.sort_by_key(|tx| tx.index);
        Self { transactions }
    }

    /// Append a message, chunking its content into fragments.
    pub fn push_message(&mut self, address: Address, tag: MessageId, content: &[u8]) {
        let start = self.transactions.len() as u32;
        if content.is_empty() {
            self.transactions.push(Transaction {
                address,
                tag,
                bundle: BundleHash::from_bytes([0u8; 32]),
                index: start,
                last_index: 0,
                fragment: Bytes::new(),
            });
            return;
        }

        for (offset, chunk) in content.chunks(FRAGMENT_CAPACITY).enumerate() {
            self.transactions.push(Transaction {
                address,
                tag,
                bundle: BundleHash::from_bytes([0u8; 32]),
                index: start + offset as u32,
                last_index: 0,
                fragment: Bytes::copy_from_slice(chunk),
            });
        }
    }

    /// Compute the content-derived bundle hash.
    ///
    /// Covers address, tag, index and fragment of every transaction;
    /// the stamped `bundle` field itself is excluded.
    pub fn hash(&self) -> BundleHash {
        let mut hasher = blake3::Hasher::new_derive_key("mamgate v0 bundle hash");
        for tx in &self.transactions {
            hasher.update(tx.address.as_bytes());
            hasher.update(tx.tag.as_bytes());
            hasher.update(&tx.index.to_le_bytes());
            hasher.update(&(tx.fragment.len() as u64).to_le_bytes());
            hasher.update(&tx.fragment);
        }
        BundleHash(*hasher.finalize().as_bytes())
    }

    /// Stamp every transaction with the bundle hash and final index.
    ///
    /// Must be called before broadcast; fetched transactions carry the
    /// stamped values back so bundles can be regrouped by hash.
    pub fn finalize(&mut self) -> BundleHash {
        let hash = self.hash();
        let last = self.transactions.len().saturating_sub(1) as u32;
        for tx in &mut self.transactions {
            tx.bundle = hash;
            tx.last_index = last;
        }
        hash
    }

    /// Reassemble the content bytes carried under `tag`, in index order.
    pub fn content_for_tag(&self, tag: &MessageId) -> Vec<u8> {
        let mut content = Vec::new();
        for tx in self.transactions.iter().filter(|tx| &tx.tag == tag) {
            content.extend_from_slice(&tx.fragment);
        }
        content
    }

    /// Distinct tags in first-seen order.
    pub fn tags(&self) -> Vec<MessageId> {
        let mut tags = Vec::new();
        for tx in &self.transactions {
            if !tags.contains(&tx.tag) {
                tags.push(tx.tag);
            }
        }
        tags
    }

    /// The transactions of this bundle.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Whether the bundle holds no transactions.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Number of transactions.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }
}
