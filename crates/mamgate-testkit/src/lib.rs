//! # mamgate testkit
//!
//! Testing utilities for mamgate.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a gateway wired to the in-memory ledger and cache,
//!   plus deterministic seeds and chain-channel helpers
//! - **Generators**: proptest strategies for seeds, depths, payloads
//!   and encryption key sets
//! - **Derivation vectors**: a fixed matrix pinning down the channel
//!   derivation scheme
//!
//! ## Fixtures
//!
//! ```rust,ignore
//! use mamgate_testkit::fixtures::TestGateway;
//!
//! let t = TestGateway::new().await;
//! t.ledger.fail_broadcasts(1);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{chain_channel, chain_channel_id, test_seed, TestGateway};
pub use vectors::{all_vectors, derive_vector, verify_all_vectors, DerivationVector};
