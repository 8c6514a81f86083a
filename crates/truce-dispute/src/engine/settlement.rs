//! Terminal transitions: timeout enforcement, escrow settlement and asset
//! release.
//!
//! Effect order on every resolution:
//!
//! 1. Unused defense subsidy back to the reserve, then the reserve-funded
//!    incentive (default-license branch only).
//! 2. Escrow payouts, then burn and dust to the sink.
//! 3. Earmarked incentive returned to the reserve (other branches).
//! 4. Asset release.
//! 5. Store write with the latch set.
//! 6. Fallback license (timeout and default-license branches only).
//!
//! Steps 1 to 5 are compensable. Step 6 is not, so it comes last: if it
//! fails, everything before it is compensated and the dispute stays open.

use truce_core::{Amount, DisputeId};

use super::txn::{Transaction, Undo};
use super::{Caller, DisputeEngine};
use crate::clock::Clock;
use crate::config::{ReservePolicy, UnfreezePolicy};
use crate::dispute::{Dispute, Outcome};
use crate::error::DisputeError;
use crate::events::DisputeEvent;
use crate::ledger::Ledger;
use crate::policy::{self, Settlement};
use crate::registry::{AssetRegistry, ReleasePayload};
use crate::store::{DisputeStore, StoreWrite};
use crate::treasury::Treasury;

/// A decided terminal transition, ready to execute.
#[derive(Debug)]
pub(crate) struct Resolution {
    pub outcome: Outcome,
    pub settlement: Settlement,
    pub payload: ReleasePayload,
    /// Apply the dispute's fallback license to the asset. Set only on the
    /// timeout branches; an accepted proposal releases the asset under the
    /// agreed terms and never receives the fallback license.
    pub apply_fallback: bool,
}

impl<L, R, T, S, C> DisputeEngine<L, R, T, S, C>
where
    L: Ledger,
    R: AssetRegistry,
    T: Treasury,
    S: DisputeStore,
    C: Clock,
{
    /// Force-resolve a dispute whose applicable deadline has passed.
    ///
    /// - Counterparty never staked and the stake window closed:
    ///   `DefaultLicenseApplied`. The initiator recovers its stake plus the
    ///   non-participation incentive if the reserve covers it in full.
    /// - Both staked and the resolution deadline passed:
    ///   `TimeoutWithBurn`. The configured share of the combined stake is
    ///   burned and the rest split evenly; the odd unit goes to the sink.
    ///
    /// Anyone may call. Returns the outcome applied.
    pub fn enforce_timeout(&mut self, caller: &Caller, id: DisputeId) -> Result<Outcome, DisputeError> {
        self.run("enforce_timeout", |engine, tx| engine.enforce_in(tx, caller, id))
    }

    fn enforce_in(&mut self, tx: &mut Transaction, caller: &Caller, id: DisputeId) -> Result<Outcome, DisputeError> {
        let dispute = self.load(id)?;
        dispute.ensure_unresolved()?;
        let now = tx.now();
        tracing::debug!(dispute_id = %id, caller = %caller.account(), "timeout enforcement requested");

        let terms_ref = dispute.fallback.terms_ref.clone();
        let resolution = if !dispute.is_fully_staked() {
            let deadline = dispute.stake_deadline(&self.config)?;
            if now <= deadline {
                return Err(DisputeError::TooEarly {
                    dispute_id: id,
                    deadline,
                });
            }
            self.return_subsidy(tx, &dispute)?;
            let incentive = self.pay_incentive(tx, &dispute)?;
            Resolution {
                outcome: Outcome::DefaultLicenseApplied,
                settlement: policy::default_license_split(dispute.initiator_stake, incentive),
                payload: ReleasePayload::DefaultLicense { terms_ref },
                apply_fallback: true,
            }
        } else {
            let deadline = dispute.resolution_deadline(&self.config)?;
            if now <= deadline {
                return Err(DisputeError::TooEarly {
                    dispute_id: id,
                    deadline,
                });
            }
            Resolution {
                outcome: Outcome::TimeoutWithBurn,
                settlement: policy::timeout_split(
                    dispute.initiator_stake,
                    dispute.counterparty_stake,
                    self.config.timeout_burn_bps,
                )?,
                payload: ReleasePayload::TimeoutWithBurn { terms_ref },
                apply_fallback: true,
            }
        };

        let outcome = resolution.outcome;
        self.resolve(tx, dispute, resolution)?;
        Ok(outcome)
    }

    /// Send a defense subsidy the counterparty never staked back to the
    /// reserve.
    fn return_subsidy(&mut self, tx: &mut Transaction, dispute: &Dispute) -> Result<(), DisputeError> {
        if dispute.subsidy.is_zero() {
            return Ok(());
        }
        let fund = self.accounts.defense_fund.clone();
        let reserve = self.treasury.reserve_account().clone();
        self.move_value(tx, &fund, &reserve, dispute.subsidy)?;
        tracing::info!(dispute_id = %dispute.id, amount = %dispute.subsidy, "unused defense subsidy returned");
        tx.emit(
            dispute.id,
            DisputeEvent::SubsidyReturned {
                amount: dispute.subsidy,
            },
        );
        Ok(())
    }

    /// Pay the non-participation incentive to the initiator. Returns what
    /// was actually paid.
    fn pay_incentive(&mut self, tx: &mut Transaction, dispute: &Dispute) -> Result<Amount, DisputeError> {
        let owed = policy::incentive_amount(dispute.initiator_stake, self.config.incentive_bps)?;
        let (source, draw, available) = match self.config.reserve_policy {
            ReservePolicy::SharedFirstCome => {
                let reserve = self.treasury.reserve_account().clone();
                let available = self.ledger.balance(&reserve);
                (reserve, policy::incentive_draw(owed, available), available)
            }
            ReservePolicy::Earmarked => (
                self.accounts.incentive_earmark.clone(),
                dispute.earmarked_incentive,
                dispute.earmarked_incentive,
            ),
        };
        if draw.is_zero() {
            if !owed.is_zero() {
                tracing::warn!(dispute_id = %dispute.id, %owed, %available, "incentive reserve short; incentive skipped");
                tx.emit(dispute.id, DisputeEvent::IncentiveSkipped { owed, available });
            }
            return Ok(Amount::ZERO);
        }
        let initiator = dispute.initiator.clone();
        self.move_value(tx, &source, &initiator, draw)?;
        Ok(draw)
    }

    /// Execute a terminal transition.
    pub(crate) fn resolve(
        &mut self,
        tx: &mut Transaction,
        mut dispute: Dispute,
        resolution: Resolution,
    ) -> Result<(), DisputeError> {
        let Resolution {
            outcome,
            settlement,
            payload,
            apply_fallback,
        } = resolution;
        let id = dispute.id;

        let total = dispute.total_stake()?;
        if !settlement.conserves(total) {
            return Err(DisputeError::ConservationViolated {
                dispute_id: id,
                expected: total,
                actual: settlement.escrow_outflow()?,
            });
        }

        let escrow = self.accounts.escrow.clone();
        let burn = self.accounts.burn_sink.clone();
        let initiator = dispute.initiator.clone();
        let counterparty = dispute.counterparty.clone();
        let burned_total = settlement.total_burned()?;
        self.move_value(tx, &escrow, &initiator, settlement.to_initiator)?;
        self.move_value(tx, &escrow, &counterparty, settlement.to_counterparty)?;
        self.move_value(tx, &escrow, &burn, burned_total)?;

        if outcome != Outcome::DefaultLicenseApplied && !dispute.earmarked_incentive.is_zero() {
            let earmark = self.accounts.incentive_earmark.clone();
            let reserve = self.treasury.reserve_account().clone();
            self.move_value(tx, &earmark, &reserve, dispute.earmarked_incentive)?;
        }

        match self.registry.unfreeze(id, &payload) {
            Ok(()) => tx.record(Undo::Unfreeze {
                dispute_id: id,
                holder: initiator.clone(),
            }),
            Err(err) => match self.config.unfreeze_policy {
                UnfreezePolicy::Strict => return Err(err.into()),
                UnfreezePolicy::BestEffort => {
                    tracing::error!(dispute_id = %id, error = %err, "asset release failed; parked for retry");
                    tx.emit(
                        id,
                        DisputeEvent::ReleasePending {
                            reason: err.to_string(),
                        },
                    );
                    dispute.pending_release = Some(payload);
                }
            },
        }

        let previous = self.load(id)?;
        let terms_ref = dispute.fallback.terms_ref.clone();
        dispute.mark_resolved(outcome, settlement, tx.now());
        self.store.write(StoreWrite::record(dispute))?;
        tx.record(Undo::Restore {
            previous: Box::new(previous),
        });

        if !burned_total.is_zero() {
            tx.emit(
                id,
                DisputeEvent::Burned {
                    amount: settlement.burned,
                    dust: settlement.dust,
                },
            );
        }
        if !settlement.incentive.is_zero() {
            tx.emit(
                id,
                DisputeEvent::IncentivePaid {
                    account: initiator,
                    amount: settlement.incentive,
                },
            );
        }
        if apply_fallback {
            self.registry.apply_fallback_license(id, &terms_ref)?;
            tx.emit(id, DisputeEvent::FallbackLicenseApplied { terms_ref });
        }
        tx.emit(
            id,
            DisputeEvent::Resolved {
                outcome,
                to_initiator: settlement.to_initiator,
                to_counterparty: settlement.to_counterparty,
                burned: settlement.burned,
                dust: settlement.dust,
                incentive: settlement.incentive,
            },
        );
        tracing::info!(
            dispute_id = %id,
            %outcome,
            to_initiator = %settlement.to_initiator,
            to_counterparty = %settlement.to_counterparty,
            burned = %burned_total,
            "dispute resolved"
        );
        Ok(())
    }

    // ─── Release retry ───────────────────────────────────────────────

    /// Retry an asset release the registry rejected at resolution under
    /// the best-effort unfreeze policy. Anyone may call.
    pub fn retry_release(&mut self, caller: &Caller, id: DisputeId) -> Result<(), DisputeError> {
        self.run("retry_release", |engine, tx| engine.retry_release_in(tx, caller, id))
    }

    fn retry_release_in(&mut self, tx: &mut Transaction, caller: &Caller, id: DisputeId) -> Result<(), DisputeError> {
        let mut dispute = self.load(id)?;
        let payload = match (&dispute.pending_release, dispute.resolved) {
            (Some(payload), true) => payload.clone(),
            _ => return Err(DisputeError::NoPendingRelease(id)),
        };
        tracing::debug!(dispute_id = %id, caller = %caller.account(), "retrying asset release");

        self.registry.unfreeze(id, &payload)?;
        tx.record(Undo::Unfreeze {
            dispute_id: id,
            holder: dispute.initiator.clone(),
        });
        dispute.pending_release = None;
        self.store.write(StoreWrite::record(dispute))?;

        tx.emit(id, DisputeEvent::ReleaseCompleted);
        Ok(())
    }
}
