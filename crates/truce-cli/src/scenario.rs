//! # Scenario Files
//!
//! A scenario is a YAML script run against a fresh in-memory engine:
//! starting balances, an optional engine configuration, an ordered list of
//! steps, and expectations checked once the last step has run.
//!
//! ```yaml
//! name: mutual-acceptance
//! reserve: 10000
//! accounts:
//!   alice: 1000
//!   bob: 1000
//! steps:
//!   - initiate: { initiator: alice, counterparty: bob, stake: 100 }
//!   - deposit: { caller: bob, dispute: 1 }
//!   - propose: { dispute: 1, text: "cross-license at 2%" }
//!   - accept: { caller: alice, dispute: 1 }
//!   - accept: { caller: bob, dispute: 1 }
//! expect:
//!   balances: { alice: 1000, bob: 1000 }
//!   outcomes: { 1: accepted_proposal }
//! ```
//!
//! A step may carry `expect_error: "<substring>"`; the step must then fail
//! with an error whose message contains that text.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use truce_dispute::{EngineConfig, FallbackLicense, Outcome};

/// Default start instant: 2026-01-01T00:00:00Z.
pub const DEFAULT_START: &str = "2026-01-01T00:00:00Z";

const DAY_SECS: u64 = 86_400;

/// A complete scripted run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name, echoed in the summary.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Clock start, RFC 3339.
    #[serde(default = "default_start")]
    pub start: String,
    /// Starting balance of the incentive reserve.
    #[serde(default)]
    pub reserve: u64,
    /// Starting balances of ordinary accounts.
    pub accounts: BTreeMap<String, u64>,
    /// Engine parameters; defaults apply to omitted fields.
    #[serde(default)]
    pub config: Option<EngineConfig>,
    /// Steps, run in order.
    pub steps: Vec<Step>,
    /// Final-state expectations.
    #[serde(default)]
    pub expect: Expectations,
}

fn default_start() -> String {
    DEFAULT_START.to_string()
}

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// What to do.
    #[serde(flatten)]
    pub action: Action,
    /// When set, the step must fail with a message containing this text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_error: Option<String>,
}

/// Engine operations and clock movements a scenario can script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Open a dispute.
    Initiate {
        /// Initiator account.
        initiator: String,
        /// Counterparty account.
        counterparty: String,
        /// Base stake; escalation may raise it.
        stake: u64,
        /// Evidence tag, hashed into the evidence digest.
        #[serde(default = "default_evidence")]
        evidence: String,
        /// Fallback license; a standard non-exclusive one when omitted.
        #[serde(default)]
        fallback: Option<FallbackLicense>,
    },
    /// Counterparty matches the stake.
    Deposit {
        /// Caller account.
        caller: String,
        /// Dispute id.
        dispute: u64,
    },
    /// The oracle submits a signed proposal.
    Propose {
        /// Dispute id.
        dispute: u64,
        /// Proposal text.
        text: String,
        /// Explicit nonce; the next unused one when omitted.
        #[serde(default)]
        nonce: Option<u64>,
    },
    /// A party accepts the pending proposal.
    Accept {
        /// Caller account.
        caller: String,
        /// Dispute id.
        dispute: u64,
    },
    /// A party rejects the proposal and pays the round fee.
    Counter {
        /// Caller account.
        caller: String,
        /// Dispute id.
        dispute: u64,
        /// Most the caller will pay.
        max_fee: u64,
        /// Evidence tag for the new bundle.
        #[serde(default = "default_evidence")]
        evidence: String,
    },
    /// The counterparty requests a defense subsidy.
    Subsidy {
        /// Caller account.
        caller: String,
        /// Dispute id.
        dispute: u64,
    },
    /// Anyone forces a timeout resolution.
    Enforce {
        /// Caller account.
        caller: String,
        /// Dispute id.
        dispute: u64,
    },
    /// Retry a parked asset release.
    RetryRelease {
        /// Caller account.
        caller: String,
        /// Dispute id.
        dispute: u64,
    },
    /// Move the clock forward.
    Advance {
        /// Whole days.
        #[serde(default)]
        days: u64,
        /// Additional seconds.
        #[serde(default)]
        secs: u64,
    },
}

fn default_evidence() -> String {
    "evidence".to_string()
}

impl Action {
    /// Short label for logs and failure messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initiate { .. } => "initiate",
            Self::Deposit { .. } => "deposit",
            Self::Propose { .. } => "propose",
            Self::Accept { .. } => "accept",
            Self::Counter { .. } => "counter",
            Self::Subsidy { .. } => "subsidy",
            Self::Enforce { .. } => "enforce",
            Self::RetryRelease { .. } => "retry_release",
            Self::Advance { .. } => "advance",
        }
    }

    /// Seconds an `advance` step moves the clock by.
    pub fn advance_secs(&self) -> Option<u64> {
        match self {
            Self::Advance { days, secs } => days
                .checked_mul(DAY_SECS)
                .and_then(|d| d.checked_add(*secs)),
            _ => None,
        }
    }
}

/// Checked after the last step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expectations {
    /// Final balances of named accounts.
    #[serde(default)]
    pub balances: BTreeMap<String, u64>,
    /// Final outcome per dispute id.
    #[serde(default)]
    pub outcomes: BTreeMap<u64, Outcome>,
    /// Total in the burn sink.
    #[serde(default)]
    pub burned: Option<u64>,
    /// Incentive reserve balance.
    #[serde(default)]
    pub reserve: Option<u64>,
    /// Escrow balance.
    #[serde(default)]
    pub escrow: Option<u64>,
}

impl Scenario {
    /// Parse a scenario from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(yaml).context("malformed scenario")?;
        if scenario.accounts.is_empty() {
            anyhow::bail!("scenario {:?} declares no accounts", scenario.name);
        }
        Ok(scenario)
    }

    /// Read and parse a scenario file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("in {}", path.display()))
    }
}
