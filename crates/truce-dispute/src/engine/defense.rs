//! # Defense Fund
//!
//! A counterparty facing a repeat filer can draw a subsidy from the
//! incentive reserve toward its defensive stake. The subsidy grows with
//! the initiator's harassment score and is capped by configuration.
//!
//! The subsidy never reaches the counterparty's wallet. It moves from the
//! reserve into the defense fund and is escrowed as part of the stake when
//! the counterparty deposits. If the counterparty never stakes, the
//! default-license resolution returns it to the reserve.
//!
//! Rules:
//!
//! - Only the counterparty may request; initiators are never subsidized.
//! - At most one subsidy per dispute, before the counterparty stakes and
//!   inside the stake window.
//! - The reserve must cover the subsidy in full.

use truce_core::{Amount, DisputeId};

use super::txn::Transaction;
use super::{Caller, DisputeEngine};
use crate::clock::Clock;
use crate::dispute::Party;
use crate::error::DisputeError;
use crate::events::DisputeEvent;
use crate::ledger::Ledger;
use crate::policy;
use crate::registry::AssetRegistry;
use crate::store::{DisputeStore, StoreWrite};
use crate::treasury::Treasury;

impl<L, R, T, S, C> DisputeEngine<L, R, T, S, C>
where
    L: Ledger,
    R: AssetRegistry,
    T: Treasury,
    S: DisputeStore,
    C: Clock,
{
    /// Set aside a defense subsidy for the counterparty's stake. Returns
    /// the amount granted.
    pub fn request_defense_subsidy(&mut self, caller: &Caller, id: DisputeId) -> Result<Amount, DisputeError> {
        self.run("request_defense_subsidy", |engine, tx| {
            engine.subsidy_in(tx, caller, id)
        })
    }

    fn subsidy_in(&mut self, tx: &mut Transaction, caller: &Caller, id: DisputeId) -> Result<Amount, DisputeError> {
        let mut dispute = self.load(id)?;
        dispute.ensure_unresolved()?;
        let refuse = |reason: &str| DisputeError::SubsidyRefused {
            dispute_id: id,
            reason: reason.to_string(),
        };

        match dispute.party_of(caller.account()) {
            Some(Party::Counterparty) => {}
            Some(Party::Initiator) => return Err(refuse("initiators are not eligible")),
            None => {
                return Err(DisputeError::NotAParty {
                    dispute_id: id,
                    caller: caller.account().clone(),
                })
            }
        }
        if dispute.is_fully_staked() {
            return Err(refuse("defensive stake already posted"));
        }
        if !dispute.subsidy.is_zero() {
            return Err(refuse("subsidy already granted"));
        }
        let deadline = dispute.stake_deadline(&self.config)?;
        if tx.now() > deadline {
            return Err(DisputeError::StakeWindowExpired {
                dispute_id: id,
                deadline,
            });
        }

        let score = self.treasury.harassment_score(&dispute.initiator);
        let amount = policy::subsidy_amount(
            dispute.initiator_stake,
            score,
            self.config.subsidy_base_bps,
            self.config.subsidy_max_bps,
        )?;
        if amount.is_zero() {
            return Err(refuse("subsidy rounds to zero"));
        }
        let reserve = self.treasury.reserve_account().clone();
        if self.ledger.balance(&reserve) < amount {
            return Err(refuse("reserve cannot cover the subsidy"));
        }

        let counterparty = dispute.counterparty.clone();
        let fund = self.accounts.defense_fund.clone();
        self.move_value(tx, &reserve, &fund, amount)?;
        dispute.subsidy = amount;
        self.store.write(StoreWrite::record(dispute))?;

        tracing::info!(dispute_id = %id, %amount, score, "defense subsidy granted");
        tx.emit(
            id,
            DisputeEvent::SubsidyGranted {
                account: counterparty,
                amount,
            },
        );
        Ok(amount)
    }
}
