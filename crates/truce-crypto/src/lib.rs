//! # truce-crypto: Cryptographic Primitives
//!
//! Ed25519 signing and verification for proposal-oracle bindings. The
//! engine trusts the oracle's *content*, but verifies that every submitted
//! proposal was signed by the configured oracle key for exactly this
//! dispute id and nonce.
//!
//! ## Crate Policy
//!
//! - Depends only on `truce-core` internally.
//! - Signing and verification accept `&CanonicalBytes` only.
//! - No mocking of cryptographic operations in tests.

pub mod ed25519;

pub use ed25519::{verify, verify_with_public_key, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
