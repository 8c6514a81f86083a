//! # truce-dispute: Dispute Resolution Engine
//!
//! Stake-backed resolution of license and IP disputes between two
//! parties. An initiator opens a dispute by escrowing a stake and freezing
//! the disputed asset; the counterparty matches the stake; a trusted
//! oracle proposes terms; and the dispute ends in exactly one of three
//! ways:
//!
//! - **AcceptedProposal**: both parties accept; stakes returned in full.
//! - **TimeoutWithBurn**: deadlock; part of the combined stake is burned,
//!   the rest split, and a non-exclusive fallback license applied.
//! - **DefaultLicenseApplied**: the counterparty never staked; the
//!   initiator recovers its stake plus an incentive and the fallback
//!   license applies.
//!
//! ## Module Map
//!
//! | Module       | Concern                                                |
//! |--------------|--------------------------------------------------------|
//! | `config`     | Protocol parameters, YAML loading, validation          |
//! | `policy`     | Pure split, fee, escalation and subsidy arithmetic     |
//! | `dispute`    | Dispute record, stage and outcome                      |
//! | `ledger`     | Value transfer trait, system accounts, in-memory ledger|
//! | `clock`      | Time source                                            |
//! | `registry`   | External asset freeze / release / fallback             |
//! | `treasury`   | Incentive reserve and harassment scores                |
//! | `oracle`     | Proposal binding, signing and verification             |
//! | `store`      | Dispute persistence                                    |
//! | `events`     | Ordered event log                                      |
//! | `engine`     | Transactional orchestration of all of the above        |
//!
//! ## Crate Policy
//!
//! - All value arithmetic goes through `truce_core::Amount` (checked).
//! - Collaborators are traits; in-memory implementations ship with the
//!   crate for simulation and tests.
//! - A failed operation leaves no trace: no value moved, no record
//!   written, no event emitted.

pub mod clock;
pub mod config;
pub mod dispute;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod oracle;
pub mod policy;
pub mod registry;
pub mod store;
pub mod treasury;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig, ReservePolicy, UnfreezePolicy};
pub use dispute::{Dispute, DisputeRoles, DisputeStage, FallbackLicense, Outcome, Party, Proposal};
pub use engine::{Caller, CounterRequest, DisputeEngine, InMemoryEngine, InitiateRequest};
pub use error::DisputeError;
pub use events::{DisputeEvent, EventLog, EventRecord};
pub use ledger::{InMemoryLedger, Ledger, LedgerError, SystemAccounts};
pub use oracle::{OracleIdentity, OracleSigner, ProposalBinding, SignedProposal, PROPOSAL_DOMAIN};
pub use policy::Settlement;
pub use registry::{
    AssetRegistry, InMemoryAssetRegistry, RegistryCall, RegistryError, RegistryFaults, ReleasePayload,
};
pub use store::{DisputeStore, InMemoryDisputeStore, StoreError};
pub use treasury::{InMemoryTreasury, Treasury, TreasuryError};
