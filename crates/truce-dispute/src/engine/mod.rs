//! # Dispute Engine
//!
//! [`DisputeEngine`] orchestrates the dispute lifecycle over five
//! collaborators: a value [`Ledger`], an [`AssetRegistry`], a
//! [`Treasury`], a [`DisputeStore`] and a [`Clock`]. The engine owns no
//! value itself; every stake, payout, burn and fee is a ledger transfer
//! between party accounts and the protocol's [`SystemAccounts`].
//!
//! ## Transactional Boundary
//!
//! Each public operation runs inside a transaction:
//!
//! 1. The clock is read once; that instant is used throughout.
//! 2. Preconditions are checked against the stored record.
//! 3. Effects are applied in a fixed order, each journaled with its
//!    compensation.
//! 4. At most one atomic store write persists the new record.
//! 5. On success, buffered events are appended to the [`EventLog`].
//!
//! If any step fails, journaled effects are compensated newest-first and
//! no event is emitted. The only irreversible effect, applying the
//! fallback license, is always the last fallible step.
//!
//! ## Security Invariant
//!
//! Value is conserved: across any sequence of operations the ledger's
//! total is unchanged, and escrow holds exactly the stake of every
//! unresolved dispute. Resolution is exactly-once: the record's latch is
//! checked before, and set in the same store write as, the final payout.

mod defense;
mod lifecycle;
mod settlement;
mod txn;

use serde::{Deserialize, Serialize};
use truce_core::{AccountId, Amount, ContentDigest, DisputeId, Timestamp};

use crate::clock::{Clock, ManualClock};
use crate::config::EngineConfig;
use crate::dispute::{Dispute, DisputeRoles, DisputeStage, FallbackLicense};
use crate::error::DisputeError;
use crate::events::{DisputeEvent, EventLog};
use crate::ledger::{InMemoryLedger, Ledger, SystemAccounts};
use crate::oracle::OracleIdentity;
use crate::registry::{AssetRegistry, InMemoryAssetRegistry, ReleasePayload};
use crate::store::{DisputeStore, InMemoryDisputeStore, StoreWrite};
use crate::treasury::{InMemoryTreasury, Treasury};

use txn::{Transaction, Undo};

/// An engine wired to the in-memory collaborators.
pub type InMemoryEngine = DisputeEngine<
    InMemoryLedger,
    InMemoryAssetRegistry,
    InMemoryTreasury,
    InMemoryDisputeStore,
    ManualClock,
>;

// ─── Requests ────────────────────────────────────────────────────────

/// The authenticated identity behind an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(AccountId);

impl Caller {
    /// Wrap an identity the host has already authenticated.
    pub fn authenticated(account: AccountId) -> Self {
        Self(account)
    }

    /// The caller's account.
    pub fn account(&self) -> &AccountId {
        &self.0
    }
}

impl From<AccountId> for Caller {
    fn from(account: AccountId) -> Self {
        Self::authenticated(account)
    }
}

/// Parameters for opening a dispute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiateRequest {
    /// Party disputed against.
    pub counterparty: AccountId,
    /// Requested stake, before any cooldown escalation.
    pub stake: Amount,
    /// Initial evidence bundle.
    pub evidence: ContentDigest,
    /// Terms applied if negotiation fails.
    pub fallback: FallbackLicense,
}

/// Parameters for a counter round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRequest {
    /// Replacement evidence bundle.
    pub evidence: ContentDigest,
    /// Most the caller is willing to pay for this round.
    pub max_fee: Amount,
}

// ─── Engine ──────────────────────────────────────────────────────────

/// The dispute resolution engine.
#[derive(Debug)]
pub struct DisputeEngine<L, R, T, S, C> {
    config: EngineConfig,
    oracle: OracleIdentity,
    accounts: SystemAccounts,
    ledger: L,
    registry: R,
    treasury: T,
    store: S,
    clock: C,
    events: EventLog,
}

impl<L, R, T, S, C> DisputeEngine<L, R, T, S, C>
where
    L: Ledger,
    R: AssetRegistry,
    T: Treasury,
    S: DisputeStore,
    C: Clock,
{
    /// Build an engine. The configuration is validated first.
    pub fn new(
        config: EngineConfig,
        oracle: OracleIdentity,
        ledger: L,
        registry: R,
        treasury: T,
        store: S,
        clock: C,
    ) -> Result<Self, DisputeError> {
        config.validate()?;
        Ok(Self {
            config,
            oracle,
            accounts: SystemAccounts::default(),
            ledger,
            registry,
            treasury,
            store,
            clock,
            events: EventLog::new(),
        })
    }

    /// Use non-default protocol accounts.
    pub fn with_system_accounts(mut self, accounts: SystemAccounts) -> Self {
        self.accounts = accounts;
        self
    }

    // ─── Accessors ───────────────────────────────────────────────────

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Configured oracle.
    pub fn oracle(&self) -> &OracleIdentity {
        &self.oracle
    }

    /// Protocol accounts.
    pub fn system_accounts(&self) -> &SystemAccounts {
        &self.accounts
    }

    /// The value ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Mutable ledger access for the host (funding, fault injection).
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    /// The asset registry.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Mutable registry access for the host.
    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// The treasury.
    pub fn treasury(&self) -> &T {
        &self.treasury
    }

    /// Mutable treasury access for the host.
    pub fn treasury_mut(&mut self) -> &mut T {
        &mut self.treasury
    }

    /// The dispute store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable store access for the host.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// The clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Committed events.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    // ─── Queries ─────────────────────────────────────────────────────

    /// Load a dispute record.
    pub fn dispute(&self, id: DisputeId) -> Result<Dispute, DisputeError> {
        self.store.get(id)?.ok_or(DisputeError::NotFound(id))
    }

    /// Number of disputes ever created.
    pub fn dispute_count(&self) -> u64 {
        self.store.count()
    }

    /// Current stage.
    pub fn stage(&self, id: DisputeId) -> Result<DisputeStage, DisputeError> {
        Ok(self.dispute(id)?.stage())
    }

    /// Both parties.
    pub fn roles(&self, id: DisputeId) -> Result<DisputeRoles, DisputeError> {
        Ok(self.dispute(id)?.roles())
    }

    /// Last instant the counterparty may stake.
    pub fn stake_deadline(&self, id: DisputeId) -> Result<Timestamp, DisputeError> {
        Ok(self.dispute(id)?.stake_deadline(&self.config)?)
    }

    /// Last instant a proposal may be submitted, accepted or countered.
    pub fn resolution_deadline(&self, id: DisputeId) -> Result<Timestamp, DisputeError> {
        Ok(self.dispute(id)?.resolution_deadline(&self.config)?)
    }

    // ─── Transaction plumbing ────────────────────────────────────────

    fn run<V>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut Self, &mut Transaction) -> Result<V, DisputeError>,
    ) -> Result<V, DisputeError> {
        let span = tracing::info_span!("dispute_op", op);
        let _guard = span.enter();

        let mut tx = Transaction::begin(op, self.clock.now());
        match f(self, &mut tx) {
            Ok(value) => {
                self.commit(tx);
                Ok(value)
            }
            Err(err) => {
                self.rollback(tx, &err);
                Err(err)
            }
        }
    }

    fn commit(&mut self, tx: Transaction) {
        let at = tx.now();
        for (dispute_id, event) in tx.into_events() {
            record_metrics(&event);
            let record = self.events.append(dispute_id, at, event);
            tracing::info!(
                sequence = record.sequence,
                dispute_id = %record.dispute_id,
                event = record.event.name(),
                "dispute event"
            );
        }
    }

    fn rollback(&mut self, tx: Transaction, err: &DisputeError) {
        let op = tx.op();
        if err.is_precondition() {
            tracing::debug!(op, error = %err, "operation rejected");
        } else {
            tracing::warn!(op, error = %err, "operation failed; compensating applied effects");
        }
        metrics::counter!("truce_operations_failed_total", "op" => op).increment(1);

        for undo in tx.into_compensations() {
            let result: Result<(), DisputeError> = match undo {
                Undo::Transfer { from, to, amount } => self
                    .ledger
                    .transfer(&to, &from, amount)
                    .map_err(DisputeError::from),
                Undo::Freeze { dispute_id } => self
                    .registry
                    .unfreeze(dispute_id, &ReleasePayload::Aborted)
                    .map_err(DisputeError::from),
                Undo::Unfreeze { dispute_id, holder } => self
                    .registry
                    .freeze(dispute_id, &holder)
                    .map_err(DisputeError::from),
                Undo::Harassment { account } => self
                    .treasury
                    .revert_harassment(&account)
                    .map_err(DisputeError::from),
                Undo::Restore { previous } => self
                    .store
                    .write(StoreWrite::record(*previous))
                    .map_err(DisputeError::from),
            };
            if let Err(compensation) = result {
                tracing::error!(op, error = %compensation, "compensation failed; manual reconciliation required");
            }
        }
    }

    fn load(&self, id: DisputeId) -> Result<Dispute, DisputeError> {
        self.dispute(id)
    }

    /// Journaled ledger transfer. Zero amounts are skipped.
    fn move_value(
        &mut self,
        tx: &mut Transaction,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), DisputeError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.ledger.transfer(from, to, amount)?;
        tx.record(Undo::Transfer {
            from: from.clone(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }
}

fn record_metrics(event: &DisputeEvent) {
    match event {
        DisputeEvent::DisputeCreated { escalated, .. } => {
            metrics::counter!("truce_disputes_created_total").increment(1);
            if *escalated {
                metrics::counter!("truce_disputes_escalated_total").increment(1);
            }
        }
        DisputeEvent::CounterProposed { .. } => {
            metrics::counter!("truce_counter_rounds_total").increment(1);
        }
        DisputeEvent::FeeBurned { amount, .. } => {
            metrics::counter!("truce_burned_total", "source" => "counter_fee").increment(amount.value());
        }
        DisputeEvent::Burned { amount, dust } => {
            metrics::counter!("truce_burned_total", "source" => "timeout")
                .increment(amount.value().saturating_add(dust.value()));
        }
        DisputeEvent::Resolved { outcome, .. } => {
            metrics::counter!("truce_disputes_resolved_total", "outcome" => outcome.as_str()).increment(1);
        }
        _ => {}
    }
}
