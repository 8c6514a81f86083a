//! # Proposal Oracle Binding
//!
//! The engine does not judge proposal content; it checks that the
//! configured oracle signed *this* text for *this* dispute under a fresh
//! nonce. The signed message is the canonical encoding of
//!
//! ```json
//! {"dispute_id": 1, "domain": "truce.proposal.v1", "nonce": 7, "text": "..."}
//! ```
//!
//! ## Security Invariant
//!
//! - The domain tag separates proposal signatures from anything else the
//!   oracle key might sign.
//! - Binding the dispute id prevents a proposal from being replayed on
//!   another dispute.
//! - Nonces are global and strictly increasing; the engine persists the
//!   last accepted nonce, so a signature cannot be replayed on a later
//!   round of the same dispute either.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use truce_core::error::{CanonicalizationError, CryptoError};
use truce_core::{sha256_digest, AccountId, CanonicalBytes, ContentDigest, DisputeId};
use truce_crypto::{verify_with_public_key, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// Domain tag for proposal signatures.
pub const PROPOSAL_DOMAIN: &str = "truce.proposal.v1";

/// Errors from building or checking a proposal binding.
#[derive(Error, Debug)]
pub enum OracleError {
    /// The binding could not be canonicalized.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// Signature or key failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// The exact message an oracle signs.
#[derive(Debug, Clone, Serialize)]
pub struct ProposalBinding<'a> {
    domain: &'static str,
    dispute_id: u64,
    nonce: u64,
    text: &'a str,
}

impl<'a> ProposalBinding<'a> {
    /// Bind `text` to a dispute and nonce.
    pub fn new(dispute_id: DisputeId, nonce: u64, text: &'a str) -> Self {
        Self {
            domain: PROPOSAL_DOMAIN,
            dispute_id: dispute_id.value(),
            nonce,
            text,
        }
    }

    /// Canonical encoding for signing.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(self)
    }

    /// Content digest of the canonical encoding.
    pub fn digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        Ok(sha256_digest(&self.canonical_bytes()?))
    }
}

/// A proposal as delivered by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedProposal {
    /// Proposed terms.
    pub text: String,
    /// Oracle nonce.
    pub nonce: u64,
    /// Signature over the [`ProposalBinding`].
    pub signature: Ed25519Signature,
}

/// Who the engine accepts proposals from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleIdentity {
    /// Authenticated caller identity of the oracle.
    pub account: AccountId,
    /// Key proposals must verify against.
    pub public_key: Ed25519PublicKey,
}

impl OracleIdentity {
    /// Verify that `proposal` was signed for `dispute_id` by this oracle.
    pub fn verify(&self, dispute_id: DisputeId, proposal: &SignedProposal) -> Result<(), OracleError> {
        let bytes = ProposalBinding::new(dispute_id, proposal.nonce, &proposal.text).canonical_bytes()?;
        verify_with_public_key(&bytes, &proposal.signature, &self.public_key)?;
        Ok(())
    }
}

/// Oracle-side signer. Holds the private key.
#[derive(Debug)]
pub struct OracleSigner {
    account: AccountId,
    keypair: Ed25519KeyPair,
}

impl OracleSigner {
    /// A signer acting as `account` with `keypair`.
    pub fn new(account: AccountId, keypair: Ed25519KeyPair) -> Self {
        Self { account, keypair }
    }

    /// The identity the engine should be configured with.
    pub fn identity(&self) -> OracleIdentity {
        OracleIdentity {
            account: self.account.clone(),
            public_key: self.keypair.public_key(),
        }
    }

    /// The oracle's caller identity.
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Sign `text` for `dispute_id` under `nonce`.
    pub fn sign(&self, dispute_id: DisputeId, nonce: u64, text: &str) -> Result<SignedProposal, OracleError> {
        let bytes = ProposalBinding::new(dispute_id, nonce, text).canonical_bytes()?;
        Ok(SignedProposal {
            text: text.to_string(),
            nonce,
            signature: self.keypair.sign(&bytes),
        })
    }
}
