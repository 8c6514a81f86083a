//! # Dispute Errors
//!
//! [`DisputeError`] separates *precondition* failures (wrong caller, wrong
//! stage, wrong time, bad input) from *collaborator* failures (ledger,
//! registry, treasury, store) and *integrity* failures (arithmetic
//! overflow, conservation). Every variant aborts the operation with no
//! committed state change and no emitted event.

use thiserror::Error;
use truce_core::{AccountId, Amount, DisputeId, Timestamp, TruceError};

use crate::config::ConfigError;
use crate::dispute::{Outcome, Party};
use crate::ledger::LedgerError;
use crate::registry::RegistryError;
use crate::store::StoreError;
use crate::treasury::TreasuryError;

/// Errors from dispute engine operations.
#[derive(Error, Debug)]
pub enum DisputeError {
    // ─── Lookup and lifecycle ────────────────────────────────────────
    /// No dispute with this id exists.
    #[error("{0} not found")]
    NotFound(DisputeId),

    /// The dispute already reached a terminal outcome.
    #[error("{dispute_id} is already resolved ({outcome})")]
    AlreadyResolved {
        /// Dispute concerned.
        dispute_id: DisputeId,
        /// Its outcome.
        outcome: Outcome,
    },

    // ─── Initiation ──────────────────────────────────────────────────
    /// Counterparty is the initiator, or a protocol account.
    #[error("invalid counterparty: {0}")]
    InvalidCounterparty(String),

    /// A dispute cannot be opened with a zero stake.
    #[error("stake must be greater than zero")]
    ZeroStake,

    /// The fallback license would grant exclusivity.
    #[error("fallback license must be non-exclusive")]
    ExclusiveFallback,

    /// The fallback license is otherwise malformed.
    #[error("invalid fallback license: {0}")]
    InvalidFallback(String),

    // ─── Authorization ───────────────────────────────────────────────
    /// Caller is neither initiator nor counterparty.
    #[error("{caller} is not a party to {dispute_id}")]
    NotAParty {
        /// Dispute concerned.
        dispute_id: DisputeId,
        /// Rejected caller.
        caller: AccountId,
    },

    /// Caller is a party, but not the one this operation requires.
    #[error("only the {expected} may do this on {dispute_id}; caller was {caller}")]
    WrongParty {
        /// Dispute concerned.
        dispute_id: DisputeId,
        /// Role that may call.
        expected: Party,
        /// Rejected caller.
        caller: AccountId,
    },

    /// Caller is not the configured oracle.
    #[error("{caller} is not the configured oracle")]
    NotOracle {
        /// Rejected caller.
        caller: AccountId,
    },

    // ─── Staking ─────────────────────────────────────────────────────
    /// The counterparty already posted its stake.
    #[error("counterparty stake already posted on {0}")]
    AlreadyStaked(DisputeId),

    /// The stake window closed.
    #[error("stake window for {dispute_id} closed at {deadline}")]
    StakeWindowExpired {
        /// Dispute concerned.
        dispute_id: DisputeId,
        /// When the window closed.
        deadline: Timestamp,
    },

    /// Both parties must be staked first.
    #[error("{0} is not fully staked")]
    NotFullyStaked(DisputeId),

    // ─── Proposals ───────────────────────────────────────────────────
    /// Proposal text was empty.
    #[error("proposal text must not be empty")]
    EmptyProposal,

    /// A proposal already stands for the current round.
    #[error("a proposal is already pending on {0}")]
    ProposalAlreadySubmitted(DisputeId),

    /// The oracle signature did not verify against the binding.
    #[error("invalid oracle signature on {dispute_id}: {reason}")]
    InvalidSignature {
        /// Dispute concerned.
        dispute_id: DisputeId,
        /// Verification failure.
        reason: String,
    },

    /// Nonce not strictly greater than the last accepted oracle nonce.
    #[error("stale oracle nonce {nonce}; last accepted was {last}")]
    StaleNonce {
        /// Rejected nonce.
        nonce: u64,
        /// Highest nonce accepted so far.
        last: u64,
    },

    /// There is no proposal to accept.
    #[error("no proposal pending on {0}")]
    NoProposal(DisputeId),

    /// The resolution deadline has passed.
    #[error("resolution deadline for {dispute_id} passed at {deadline}")]
    DeadlinePassed {
        /// Dispute concerned.
        dispute_id: DisputeId,
        /// The deadline.
        deadline: Timestamp,
    },

    /// This party already accepted the current proposal.
    #[error("{party} already accepted the proposal on {dispute_id}")]
    AlreadyAccepted {
        /// Dispute concerned.
        dispute_id: DisputeId,
        /// Who accepted.
        party: Party,
    },

    // ─── Counter rounds ──────────────────────────────────────────────
    /// No counter rounds remain.
    #[error("{dispute_id} reached the maximum of {max} counter rounds")]
    MaxCountersReached {
        /// Dispute concerned.
        dispute_id: DisputeId,
        /// Configured cap.
        max: u32,
    },

    /// The caller's fee offer is below the required fee.
    #[error("counter fee of {required} required, {offered} offered")]
    InsufficientFee {
        /// Fee for this round.
        required: Amount,
        /// Caller's ceiling.
        offered: Amount,
    },

    // ─── Timeout ─────────────────────────────────────────────────────
    /// The applicable deadline has not passed yet.
    #[error("too early to enforce {dispute_id}; deadline is {deadline}")]
    TooEarly {
        /// Dispute concerned.
        dispute_id: DisputeId,
        /// The deadline that must pass first.
        deadline: Timestamp,
    },

    /// There is no parked asset release to retry.
    #[error("no pending asset release on {0}")]
    NoPendingRelease(DisputeId),

    /// The defense subsidy was refused.
    #[error("defense subsidy refused on {dispute_id}: {reason}")]
    SubsidyRefused {
        /// Dispute concerned.
        dispute_id: DisputeId,
        /// Why.
        reason: String,
    },

    // ─── Collaborators ───────────────────────────────────────────────
    /// Value ledger failure.
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    /// Asset registry failure.
    #[error("asset registry: {0}")]
    Registry(#[from] RegistryError),

    /// Treasury failure.
    #[error("treasury: {0}")]
    Treasury(#[from] TreasuryError),

    /// Dispute store failure.
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ─── Integrity ───────────────────────────────────────────────────
    /// Checked arithmetic failed.
    #[error(transparent)]
    Arithmetic(#[from] TruceError),

    /// A settlement did not drain exactly the escrowed stake.
    #[error("settlement for {dispute_id} moves {actual} out of escrow, expected {expected}")]
    ConservationViolated {
        /// Dispute concerned.
        dispute_id: DisputeId,
        /// Combined stake.
        expected: Amount,
        /// Settlement outflow.
        actual: Amount,
    },

    /// The engine configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DisputeError {
    /// Whether the failure is a rejected request rather than a fault in a
    /// collaborator or an integrity check.
    pub fn is_precondition(&self) -> bool {
        !matches!(
            self,
            Self::Ledger(_)
                | Self::Registry(_)
                | Self::Treasury(_)
                | Self::Store(_)
                | Self::Arithmetic(_)
                | Self::ConservationViolated { .. }
                | Self::Config(_)
        )
    }
}
