//! # Asset Registry
//!
//! The disputed IP asset lives outside the engine. The engine asks the
//! [`AssetRegistry`] to freeze it when a dispute opens, to release it at
//! resolution with a payload describing the outcome, and to apply the
//! fallback license when negotiation fails.
//!
//! ## Security Invariant
//!
//! For every dispute: `freeze` is called exactly once at initiation,
//! `unfreeze` exactly once at resolution, and `apply_fallback_license` at
//! most once, only on the timeout and default-license branches. The
//! in-memory registry rejects repeats so a double call surfaces as an
//! error rather than silently succeeding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use truce_core::{AccountId, DisputeId};

/// What the registry is told when a frozen asset is released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReleasePayload {
    /// Parties agreed on these terms.
    AcceptedProposal {
        /// Agreed terms.
        text: String,
    },
    /// Deadlock; fallback terms follow.
    TimeoutWithBurn {
        /// Fallback terms reference.
        terms_ref: String,
    },
    /// Counterparty never staked; fallback terms follow.
    DefaultLicense {
        /// Fallback terms reference.
        terms_ref: String,
    },
    /// The dispute was never committed; undo the freeze.
    Aborted,
}

impl ReleasePayload {
    /// Stable identifier.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AcceptedProposal { .. } => "accepted_proposal",
            Self::TimeoutWithBurn { .. } => "timeout_with_burn",
            Self::DefaultLicense { .. } => "default_license",
            Self::Aborted => "aborted",
        }
    }
}

/// Errors from the asset registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The asset for this dispute is already frozen.
    #[error("asset for {0} is already frozen")]
    AlreadyFrozen(DisputeId),

    /// There is no frozen asset to release.
    #[error("asset for {0} is not frozen")]
    NotFrozen(DisputeId),

    /// The fallback license was already applied.
    #[error("fallback license for {0} already applied")]
    FallbackAlreadyApplied(DisputeId),

    /// The registry refused the call.
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// External asset control.
pub trait AssetRegistry {
    /// Freeze the disputed asset held by `holder`.
    fn freeze(&mut self, dispute_id: DisputeId, holder: &AccountId) -> Result<(), RegistryError>;

    /// Release the disputed asset.
    fn unfreeze(&mut self, dispute_id: DisputeId, payload: &ReleasePayload) -> Result<(), RegistryError>;

    /// Apply the fallback license terms.
    fn apply_fallback_license(&mut self, dispute_id: DisputeId, terms_ref: &str) -> Result<(), RegistryError>;
}

// ─── In-memory registry ──────────────────────────────────────────────

/// A registry call, as observed by [`InMemoryAssetRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum RegistryCall {
    /// `freeze`
    Freeze {
        /// Dispute.
        dispute_id: DisputeId,
    },
    /// `unfreeze`
    Unfreeze {
        /// Dispute.
        dispute_id: DisputeId,
        /// Payload kind.
        payload: String,
    },
    /// `apply_fallback_license`
    ApplyFallback {
        /// Dispute.
        dispute_id: DisputeId,
    },
}

/// Which registry calls should fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryFaults {
    /// Fail `freeze`.
    pub freeze: bool,
    /// Fail `unfreeze`.
    pub unfreeze: bool,
    /// Fail `apply_fallback_license`.
    pub apply_fallback: bool,
}

/// Deterministic in-process registry recording every successful call.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssetRegistry {
    frozen: BTreeMap<DisputeId, AccountId>,
    released: BTreeMap<DisputeId, ReleasePayload>,
    fallback: BTreeMap<DisputeId, String>,
    calls: Vec<RegistryCall>,
    faults: RegistryFaults,
}

impl InMemoryAssetRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure call failures.
    pub fn set_faults(&mut self, faults: RegistryFaults) {
        self.faults = faults;
    }

    /// Whether the asset for `dispute_id` is currently frozen.
    pub fn is_frozen(&self, dispute_id: DisputeId) -> bool {
        self.frozen.contains_key(&dispute_id)
    }

    /// The payload the asset was released with.
    pub fn release_of(&self, dispute_id: DisputeId) -> Option<&ReleasePayload> {
        self.released.get(&dispute_id)
    }

    /// The fallback terms applied, if any.
    pub fn fallback_of(&self, dispute_id: DisputeId) -> Option<&str> {
        self.fallback.get(&dispute_id).map(String::as_str)
    }

    /// Every successful call, in order.
    pub fn calls(&self) -> &[RegistryCall] {
        &self.calls
    }

    /// Successful calls concerning one dispute.
    pub fn calls_for(&self, dispute_id: DisputeId) -> Vec<&RegistryCall> {
        self.calls
            .iter()
            .filter(|call| match call {
                RegistryCall::Freeze { dispute_id: id }
                | RegistryCall::Unfreeze { dispute_id: id, .. }
                | RegistryCall::ApplyFallback { dispute_id: id } => *id == dispute_id,
            })
            .collect()
    }
}

impl AssetRegistry for InMemoryAssetRegistry {
    fn freeze(&mut self, dispute_id: DisputeId, holder: &AccountId) -> Result<(), RegistryError> {
        if self.faults.freeze {
            return Err(RegistryError::Unavailable("freeze refused".to_string()));
        }
        if self.frozen.contains_key(&dispute_id) {
            return Err(RegistryError::AlreadyFrozen(dispute_id));
        }
        self.frozen.insert(dispute_id, holder.clone());
        self.released.remove(&dispute_id);
        self.calls.push(RegistryCall::Freeze { dispute_id });
        Ok(())
    }

    fn unfreeze(&mut self, dispute_id: DisputeId, payload: &ReleasePayload) -> Result<(), RegistryError> {
        if self.faults.unfreeze {
            return Err(RegistryError::Unavailable("unfreeze refused".to_string()));
        }
        if self.frozen.remove(&dispute_id).is_none() {
            return Err(RegistryError::NotFrozen(dispute_id));
        }
        self.released.insert(dispute_id, payload.clone());
        self.calls.push(RegistryCall::Unfreeze {
            dispute_id,
            payload: payload.kind().to_string(),
        });
        Ok(())
    }

    fn apply_fallback_license(&mut self, dispute_id: DisputeId, terms_ref: &str) -> Result<(), RegistryError> {
        if self.faults.apply_fallback {
            return Err(RegistryError::Unavailable("fallback refused".to_string()));
        }
        if self.fallback.contains_key(&dispute_id) {
            return Err(RegistryError::FallbackAlreadyApplied(dispute_id));
        }
        self.fallback.insert(dispute_id, terms_ref.to_string());
        self.calls.push(RegistryCall::ApplyFallback { dispute_id });
        Ok(())
    }
}
