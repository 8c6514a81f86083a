//! # Event Log
//!
//! Every committed state change produces one or more [`DisputeEvent`]s,
//! appended to the [`EventLog`] in commit order. Events are the
//! observable contract of the engine: a failed operation emits nothing,
//! and a successful one emits its events only after every effect (ledger,
//! registry, store) has landed.

use serde::{Deserialize, Serialize};
use truce_core::{AccountId, Amount, ContentDigest, DisputeId, Timestamp};

use crate::dispute::{Outcome, Party};

/// A state change observed on a dispute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisputeEvent {
    /// A dispute was opened.
    DisputeCreated {
        /// Filed the dispute.
        initiator: AccountId,
        /// Filed against.
        counterparty: AccountId,
        /// Requested stake.
        base_stake: Amount,
        /// Escrowed stake.
        stake: Amount,
        /// Whether the cooldown multiplier applied.
        escalated: bool,
        /// Evidence bundle.
        evidence: ContentDigest,
        /// Counterparty stake deadline.
        stake_deadline: Timestamp,
    },
    /// A party escrowed stake.
    Staked {
        /// Role.
        party: Party,
        /// Account debited.
        account: AccountId,
        /// Amount escrowed.
        amount: Amount,
    },
    /// Both parties are staked.
    FullyStaked {
        /// Combined stake.
        total: Amount,
        /// Resolution deadline.
        resolution_deadline: Timestamp,
    },
    /// The oracle submitted a proposal.
    ProposalSubmitted {
        /// Oracle nonce.
        nonce: u64,
        /// Digest of the signed binding.
        binding: ContentDigest,
    },
    /// A party accepted the proposal.
    ProposalAccepted {
        /// Role.
        party: Party,
    },
    /// A counter fee was paid.
    FeeBurned {
        /// Payer.
        account: AccountId,
        /// Fee burned.
        amount: Amount,
        /// Over-payment routed to the fee pool.
        routed_to_pool: Amount,
    },
    /// A counter round began.
    CounterProposed {
        /// Role.
        party: Party,
        /// Rounds used, including this one.
        round: u32,
        /// Replacement evidence.
        evidence: ContentDigest,
        /// Extension granted.
        extension_secs: u64,
        /// New resolution deadline.
        resolution_deadline: Timestamp,
    },
    /// A defense subsidy was set aside for the counterparty's stake.
    SubsidyGranted {
        /// Beneficiary.
        account: AccountId,
        /// Amount.
        amount: Amount,
    },
    /// The counterparty never staked; its subsidy went back to the reserve.
    SubsidyReturned {
        /// Amount.
        amount: Amount,
    },
    /// Value went to the burn sink at resolution.
    Burned {
        /// Policy burn.
        amount: Amount,
        /// Split remainder.
        dust: Amount,
    },
    /// The non-participation incentive was paid.
    IncentivePaid {
        /// Recipient.
        account: AccountId,
        /// Amount.
        amount: Amount,
    },
    /// The reserve could not cover the incentive in full; nothing paid.
    IncentiveSkipped {
        /// Amount owed.
        owed: Amount,
        /// Reserve balance.
        available: Amount,
    },
    /// The registry did not confirm the asset release.
    ReleasePending {
        /// Registry failure.
        reason: String,
    },
    /// A parked release was confirmed.
    ReleaseCompleted,
    /// The fallback license was applied.
    FallbackLicenseApplied {
        /// Terms reference.
        terms_ref: String,
    },
    /// Terminal transition.
    Resolved {
        /// Outcome.
        outcome: Outcome,
        /// Escrow to initiator.
        to_initiator: Amount,
        /// Escrow to counterparty.
        to_counterparty: Amount,
        /// Burned by policy.
        burned: Amount,
        /// Split remainder.
        dust: Amount,
        /// Reserve-funded incentive.
        incentive: Amount,
    },
}

impl DisputeEvent {
    /// Stable event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DisputeCreated { .. } => "dispute_created",
            Self::Staked { .. } => "staked",
            Self::FullyStaked { .. } => "fully_staked",
            Self::ProposalSubmitted { .. } => "proposal_submitted",
            Self::ProposalAccepted { .. } => "proposal_accepted",
            Self::FeeBurned { .. } => "fee_burned",
            Self::CounterProposed { .. } => "counter_proposed",
            Self::SubsidyGranted { .. } => "subsidy_granted",
            Self::SubsidyReturned { .. } => "subsidy_returned",
            Self::Burned { .. } => "burned",
            Self::IncentivePaid { .. } => "incentive_paid",
            Self::IncentiveSkipped { .. } => "incentive_skipped",
            Self::ReleasePending { .. } => "release_pending",
            Self::ReleaseCompleted => "release_completed",
            Self::FallbackLicenseApplied { .. } => "fallback_license_applied",
            Self::Resolved { .. } => "resolved",
        }
    }
}

/// An event with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Global, gap-free sequence number starting at 1.
    pub sequence: u64,
    /// Dispute concerned.
    pub dispute_id: DisputeId,
    /// Commit time.
    pub at: Timestamp,
    /// The event.
    #[serde(flatten)]
    pub event: DisputeEvent,
}

/// Append-only, totally ordered event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, dispute_id: DisputeId, at: Timestamp, event: DisputeEvent) -> &EventRecord {
        let sequence = self.records.len() as u64 + 1;
        self.records.push(EventRecord {
            sequence,
            dispute_id,
            at,
            event,
        });
        &self.records[self.records.len() - 1]
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records for one dispute, oldest first.
    pub fn for_dispute(&self, dispute_id: DisputeId) -> impl Iterator<Item = &EventRecord> {
        self.records.iter().filter(move |r| r.dispute_id == dispute_id)
    }

    /// Records with a sequence number greater than `sequence`.
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = usize::try_from(sequence).unwrap_or(usize::MAX).min(self.records.len());
        &self.records[start..]
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
