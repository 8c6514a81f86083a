//! # Dispute Record
//!
//! The per-dispute state the engine persists, and the derived lifecycle
//! stage.
//!
//! ## Stages
//!
//! ```text
//! Staked ──▶ ProposalPending ──▶ ProposalReady ──▶ Resolved(AcceptedProposal)
//!   │               │   ▲              │
//!   │               │   └── counter ───┘
//!   │               │
//!   │               └──▶ Resolved(TimeoutWithBurn)     (resolution deadline passed)
//!   │
//!   └──▶ Resolved(DefaultLicenseApplied)               (stake window passed, counterparty silent)
//! ```
//!
//! `Staked` means only the initiator has staked. The stage is derived
//! from the record's fields, never stored, so it cannot drift.
//!
//! ## Security Invariant
//!
//! `resolved` is a one-way latch: once set, `outcome` is fixed and no
//! further value moves for this dispute. Both are set together by
//! [`Dispute::mark_resolved`], the only place either changes.

use serde::{Deserialize, Serialize};
use truce_core::{AccountId, Amount, ContentDigest, DisputeId, Timestamp, TruceError};
use truce_crypto::Ed25519Signature;

use crate::config::EngineConfig;
use crate::error::DisputeError;
use crate::policy::Settlement;
use crate::registry::ReleasePayload;

// ─── Outcome ─────────────────────────────────────────────────────────

/// How a dispute ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Not yet resolved.
    Pending,
    /// Both parties accepted the oracle's proposal.
    AcceptedProposal,
    /// Deadlock: resolution deadline passed with both parties staked.
    TimeoutWithBurn,
    /// Counterparty never staked; fallback license applied.
    DefaultLicenseApplied,
}

impl Outcome {
    /// Stable identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::AcceptedProposal => "accepted_proposal",
            Self::TimeoutWithBurn => "timeout_with_burn",
            Self::DefaultLicenseApplied => "default_license_applied",
        }
    }

    /// Whether this outcome is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Party ───────────────────────────────────────────────────────────

/// A role in a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    /// Filed the dispute.
    Initiator,
    /// The party the dispute was filed against.
    Counterparty,
}

impl Party {
    /// Stable identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiator => "initiator",
            Self::Counterparty => "counterparty",
        }
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two parties to a dispute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeRoles {
    /// Filed the dispute.
    pub initiator: AccountId,
    /// Filed against.
    pub counterparty: AccountId,
}

// ─── Stage ───────────────────────────────────────────────────────────

/// Lifecycle stage, derived from the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "stage", content = "outcome")]
pub enum DisputeStage {
    /// Only the initiator has staked.
    Staked,
    /// Both staked, no proposal for the current round.
    ProposalPending,
    /// A proposal stands and awaits acceptance.
    ProposalReady,
    /// Terminal.
    Resolved(Outcome),
}

impl DisputeStage {
    /// Stable identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staked => "staked",
            Self::ProposalPending => "proposal_pending",
            Self::ProposalReady => "proposal_ready",
            Self::Resolved(_) => "resolved",
        }
    }
}

impl std::fmt::Display for DisputeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolved(outcome) => write!(f, "resolved({outcome})"),
            other => f.write_str(other.as_str()),
        }
    }
}

// ─── Fallback license ────────────────────────────────────────────────

/// Terms applied to the disputed asset when negotiation fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackLicense {
    /// Reference to the full license text held off-engine.
    pub terms_ref: String,
    /// License duration in seconds.
    pub duration_secs: u64,
    /// Royalty ceiling in bps.
    pub royalty_cap_bps: u64,
    /// Must be `false`; exclusive fallbacks are rejected at initiation.
    #[serde(default)]
    pub exclusive: bool,
}

impl FallbackLicense {
    /// A non-exclusive fallback license.
    pub fn non_exclusive(terms_ref: impl Into<String>, duration_secs: u64, royalty_cap_bps: u64) -> Self {
        Self {
            terms_ref: terms_ref.into(),
            duration_secs,
            royalty_cap_bps,
            exclusive: false,
        }
    }

    /// Check the license terms.
    pub fn validate(&self) -> Result<(), DisputeError> {
        if self.exclusive {
            return Err(DisputeError::ExclusiveFallback);
        }
        if self.terms_ref.trim().is_empty() {
            return Err(DisputeError::InvalidFallback(
                "terms reference must not be empty".to_string(),
            ));
        }
        if self.duration_secs == 0 {
            return Err(DisputeError::InvalidFallback(
                "duration must be greater than zero".to_string(),
            ));
        }
        if self.royalty_cap_bps > truce_core::BPS_DENOMINATOR {
            return Err(DisputeError::InvalidFallback(format!(
                "royalty cap {} bps exceeds 100%",
                self.royalty_cap_bps
            )));
        }
        Ok(())
    }
}

// ─── Proposal ────────────────────────────────────────────────────────

/// The oracle proposal standing for the current round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposed settlement terms.
    pub text: String,
    /// Oracle nonce the proposal was signed with.
    pub nonce: u64,
    /// Oracle signature over the proposal binding.
    pub signature: Ed25519Signature,
    /// When the engine accepted the submission.
    pub submitted_at: Timestamp,
}

// ─── Dispute ─────────────────────────────────────────────────────────

/// A dispute record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    /// Identifier, assigned at creation and never reused.
    pub id: DisputeId,
    /// Filed the dispute.
    pub initiator: AccountId,
    /// Filed against.
    pub counterparty: AccountId,
    /// Stake requested before escalation.
    pub base_stake: Amount,
    /// Stake actually escrowed by the initiator.
    pub initiator_stake: Amount,
    /// Stake escrowed by the counterparty; zero until deposited.
    pub counterparty_stake: Amount,
    /// Whether the cooldown multiplier was applied.
    pub escalated: bool,
    /// Creation time.
    pub created_at: Timestamp,
    /// Anchor for both deadlines; rebased by counter rounds.
    pub start_time: Timestamp,
    /// Total deadline extension granted so far.
    pub cumulative_extension_secs: u64,
    /// Current evidence bundle.
    pub evidence: ContentDigest,
    /// Standing proposal, if any.
    pub proposal: Option<Proposal>,
    /// Initiator accepted the standing proposal.
    pub initiator_accepted: bool,
    /// Counterparty accepted the standing proposal.
    pub counterparty_accepted: bool,
    /// Counter rounds used.
    pub counter_count: u32,
    /// Terms applied on failure.
    pub fallback: FallbackLicense,
    /// Incentive set aside at initiation (earmarked reserve policy).
    pub earmarked_incentive: Amount,
    /// Defense subsidy granted to the counterparty. Held in the defense
    /// fund until it stakes, then counted toward its stake.
    pub subsidy: Amount,
    /// One-way resolution latch.
    pub resolved: bool,
    /// Outcome; `Pending` until resolved.
    pub outcome: Outcome,
    /// How escrow was settled.
    pub settlement: Option<Settlement>,
    /// When the dispute resolved.
    pub resolved_at: Option<Timestamp>,
    /// Asset release the registry has not yet confirmed.
    pub pending_release: Option<ReleasePayload>,
}

/// Inputs for a new dispute record.
#[derive(Debug, Clone)]
pub(crate) struct NewDispute {
    pub id: DisputeId,
    pub initiator: AccountId,
    pub counterparty: AccountId,
    pub base_stake: Amount,
    pub stake: Amount,
    pub escalated: bool,
    pub now: Timestamp,
    pub evidence: ContentDigest,
    pub fallback: FallbackLicense,
    pub earmarked_incentive: Amount,
}

impl Dispute {
    pub(crate) fn open(new: NewDispute) -> Self {
        Self {
            id: new.id,
            initiator: new.initiator,
            counterparty: new.counterparty,
            base_stake: new.base_stake,
            initiator_stake: new.stake,
            counterparty_stake: Amount::ZERO,
            escalated: new.escalated,
            created_at: new.now,
            start_time: new.now,
            cumulative_extension_secs: 0,
            evidence: new.evidence,
            proposal: None,
            initiator_accepted: false,
            counterparty_accepted: false,
            counter_count: 0,
            fallback: new.fallback,
            earmarked_incentive: new.earmarked_incentive,
            subsidy: Amount::ZERO,
            resolved: false,
            outcome: Outcome::Pending,
            settlement: None,
            resolved_at: None,
            pending_release: None,
        }
    }

    /// Current lifecycle stage.
    pub fn stage(&self) -> DisputeStage {
        if self.resolved {
            DisputeStage::Resolved(self.outcome)
        } else if self.counterparty_stake.is_zero() {
            DisputeStage::Staked
        } else if self.proposal.is_some() {
            DisputeStage::ProposalReady
        } else {
            DisputeStage::ProposalPending
        }
    }

    /// Both parties.
    pub fn roles(&self) -> DisputeRoles {
        DisputeRoles {
            initiator: self.initiator.clone(),
            counterparty: self.counterparty.clone(),
        }
    }

    /// The role `account` plays, if any.
    pub fn party_of(&self, account: &AccountId) -> Option<Party> {
        if *account == self.initiator {
            Some(Party::Initiator)
        } else if *account == self.counterparty {
            Some(Party::Counterparty)
        } else {
            None
        }
    }

    /// Whether the counterparty has posted its stake.
    pub fn is_fully_staked(&self) -> bool {
        !self.counterparty_stake.is_zero()
    }

    /// Combined escrowed stake.
    pub fn total_stake(&self) -> Result<Amount, TruceError> {
        self.initiator_stake.checked_add(self.counterparty_stake)
    }

    /// Last instant the counterparty may stake.
    pub fn stake_deadline(&self, config: &EngineConfig) -> Result<Timestamp, TruceError> {
        self.start_time.checked_add_secs(config.stake_window_secs)
    }

    /// Last instant a proposal may be submitted, accepted or countered.
    pub fn resolution_deadline(&self, config: &EngineConfig) -> Result<Timestamp, TruceError> {
        self.start_time.checked_add_secs(config.resolution_timeout_secs)
    }

    /// Whether `party` accepted the standing proposal.
    pub fn has_accepted(&self, party: Party) -> bool {
        match party {
            Party::Initiator => self.initiator_accepted,
            Party::Counterparty => self.counterparty_accepted,
        }
    }

    /// Whether both parties accepted the standing proposal.
    pub fn both_accepted(&self) -> bool {
        self.initiator_accepted && self.counterparty_accepted
    }

    /// Fail with `AlreadyResolved` once the latch is set.
    pub fn ensure_unresolved(&self) -> Result<(), DisputeError> {
        if self.resolved {
            return Err(DisputeError::AlreadyResolved {
                dispute_id: self.id,
                outcome: self.outcome,
            });
        }
        Ok(())
    }

    pub(crate) fn set_accepted(&mut self, party: Party) {
        match party {
            Party::Initiator => self.initiator_accepted = true,
            Party::Counterparty => self.counterparty_accepted = true,
        }
    }

    /// Start a new counter round: replace evidence, clear the proposal and
    /// both acceptances, extend the deadline by `extension_secs`.
    pub(crate) fn begin_counter_round(
        &mut self,
        evidence: ContentDigest,
        extension_secs: u64,
    ) -> Result<(), TruceError> {
        self.start_time = self.start_time.checked_add_secs(extension_secs)?;
        self.cumulative_extension_secs = self
            .cumulative_extension_secs
            .checked_add(extension_secs)
            .ok_or(TruceError::ArithmeticOverflow("cumulative extension"))?;
        self.counter_count = self
            .counter_count
            .checked_add(1)
            .ok_or(TruceError::ArithmeticOverflow("counter count"))?;
        self.evidence = evidence;
        self.proposal = None;
        self.initiator_accepted = false;
        self.counterparty_accepted = false;
        Ok(())
    }

    pub(crate) fn mark_resolved(&mut self, outcome: Outcome, settlement: Settlement, at: Timestamp) {
        self.resolved = true;
        self.outcome = outcome;
        self.settlement = Some(settlement);
        self.resolved_at = Some(at);
    }
}
