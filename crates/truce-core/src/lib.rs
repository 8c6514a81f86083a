//! # truce-core: Foundational Types for the Truce Dispute Engine
//!
//! The leaf of the workspace DAG. Defines the primitives every other crate
//! builds on, with correctness pushed into the type system.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `AccountId` and `DisputeId` are
//!    distinct types. A dispute id cannot be passed where an account is
//!    expected, and account ids are validated at construction.
//!
//! 2. **Checked value arithmetic.** `Amount` wraps a `u64` and only exposes
//!    checked addition/subtraction and basis-point scaling through `u128`
//!    intermediates. Wraparound is impossible by construction.
//!
//! 3. **`CanonicalBytes` newtype.** Everything that is signed or hashed
//!    (oracle proposal bindings, evidence digests) flows through
//!    `CanonicalBytes::new()`, which rejects floats and emits RFC 8785 JSON.
//!
//! 4. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision;
//!    deadline arithmetic is checked.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `truce-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use amount::{Amount, BPS_DENOMINATOR};
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::TruceError;
pub use identity::{AccountId, DisputeId};
pub use temporal::Timestamp;
