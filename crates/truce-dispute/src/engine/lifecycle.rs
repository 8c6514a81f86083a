//! Initiation, staking, proposals, acceptance and counter rounds.

use truce_core::{Amount, DisputeId, TruceError};

use super::txn::{Transaction, Undo};
use super::{Caller, CounterRequest, DisputeEngine, InitiateRequest};
use crate::clock::Clock;
use crate::config::ReservePolicy;
use crate::dispute::{Dispute, NewDispute, Outcome, Party, Proposal};
use crate::error::DisputeError;
use crate::events::DisputeEvent;
use crate::ledger::Ledger;
use crate::oracle::{ProposalBinding, SignedProposal};
use crate::policy::{self, PolicyError};
use crate::registry::{AssetRegistry, ReleasePayload};
use crate::store::{CooldownTouch, DisputeStore, StoreWrite};
use crate::treasury::Treasury;

use super::settlement::Resolution;

impl<L, R, T, S, C> DisputeEngine<L, R, T, S, C>
where
    L: Ledger,
    R: AssetRegistry,
    T: Treasury,
    S: DisputeStore,
    C: Clock,
{
    // ─── Initiate ────────────────────────────────────────────────────

    /// Open a dispute against `request.counterparty`, escrowing the
    /// initiator's stake and freezing the disputed asset.
    ///
    /// If the caller opened a dispute against the same counterparty within
    /// the cooldown window, the stake is escalated by the configured
    /// multiplier and the caller's harassment score is bumped.
    pub fn initiate(&mut self, caller: &Caller, request: InitiateRequest) -> Result<DisputeId, DisputeError> {
        self.run("initiate", |engine, tx| engine.initiate_in(tx, caller, request))
    }

    fn initiate_in(
        &mut self,
        tx: &mut Transaction,
        caller: &Caller,
        request: InitiateRequest,
    ) -> Result<DisputeId, DisputeError> {
        let InitiateRequest {
            counterparty,
            stake,
            evidence,
            fallback,
        } = request;
        let initiator = caller.account().clone();

        if counterparty == initiator {
            return Err(DisputeError::InvalidCounterparty(format!(
                "{initiator} cannot open a dispute against itself"
            )));
        }
        if initiator.is_system() || counterparty.is_system() {
            return Err(DisputeError::InvalidCounterparty(
                "protocol accounts cannot be parties".to_string(),
            ));
        }
        if stake.is_zero() {
            return Err(DisputeError::ZeroStake);
        }
        fallback.validate()?;

        let now = tx.now();
        let last = self.store.last_dispute_between(&initiator, &counterparty);
        let escalation = policy::escalated_stake(
            stake,
            last,
            now,
            self.config.cooldown_secs,
            self.config.escalation_multiplier_bps,
        )?;
        let id = self.store.next_id();

        let escrow = self.accounts.escrow.clone();
        self.move_value(tx, &initiator, &escrow, escalation.stake)?;

        let earmarked = match self.config.reserve_policy {
            ReservePolicy::Earmarked => self.earmark_incentive(tx, id, escalation.stake)?,
            ReservePolicy::SharedFirstCome => Amount::ZERO,
        };

        if escalation.escalated {
            let score = self.treasury.record_harassment(&initiator)?;
            tx.record(Undo::Harassment {
                account: initiator.clone(),
            });
            tracing::warn!(
                dispute_id = %id,
                initiator = %initiator,
                counterparty = %counterparty,
                stake = %escalation.stake,
                score,
                "repeat filing inside cooldown window; stake escalated"
            );
        }

        self.registry.freeze(id, &initiator)?;
        tx.record(Undo::Freeze { dispute_id: id });

        let dispute = Dispute::open(NewDispute {
            id,
            initiator: initiator.clone(),
            counterparty: counterparty.clone(),
            base_stake: stake,
            stake: escalation.stake,
            escalated: escalation.escalated,
            now,
            evidence: evidence.clone(),
            fallback,
            earmarked_incentive: earmarked,
        });
        let stake_deadline = dispute.stake_deadline(&self.config)?;
        self.store.write(StoreWrite {
            dispute,
            cooldown: Some(CooldownTouch {
                initiator: initiator.clone(),
                counterparty: counterparty.clone(),
                at: now,
            }),
            oracle_nonce: None,
        })?;

        tx.emit(
            id,
            DisputeEvent::DisputeCreated {
                initiator: initiator.clone(),
                counterparty,
                base_stake: stake,
                stake: escalation.stake,
                escalated: escalation.escalated,
                evidence,
                stake_deadline,
            },
        );
        tx.emit(
            id,
            DisputeEvent::Staked {
                party: Party::Initiator,
                account: initiator,
                amount: escalation.stake,
            },
        );
        Ok(id)
    }

    /// Set aside the incentive for `dispute_id` under the earmarked
    /// reserve policy. All or nothing.
    fn earmark_incentive(
        &mut self,
        tx: &mut Transaction,
        dispute_id: DisputeId,
        stake: Amount,
    ) -> Result<Amount, DisputeError> {
        let owed = policy::incentive_amount(stake, self.config.incentive_bps)?;
        let reserve = self.treasury.reserve_account().clone();
        let available = self.ledger.balance(&reserve);
        let draw = policy::incentive_draw(owed, available);
        if draw.is_zero() && !owed.is_zero() {
            tracing::info!(%dispute_id, %owed, %available, "reserve cannot cover incentive; nothing earmarked");
        }
        let earmark = self.accounts.incentive_earmark.clone();
        self.move_value(tx, &reserve, &earmark, draw)?;
        Ok(draw)
    }

    // ─── Counterparty stake ──────────────────────────────────────────

    /// Escrow the counterparty's stake, equal to the initiator's. A granted
    /// defense subsidy covers part of it; the caller pays the rest.
    ///
    /// Rejected once either the stake window or the resolution deadline
    /// has passed.
    pub fn deposit_counterparty_stake(&mut self, caller: &Caller, id: DisputeId) -> Result<(), DisputeError> {
        self.run("deposit_counterparty_stake", |engine, tx| {
            engine.deposit_in(tx, caller, id)
        })
    }

    fn deposit_in(&mut self, tx: &mut Transaction, caller: &Caller, id: DisputeId) -> Result<(), DisputeError> {
        let mut dispute = self.load(id)?;
        dispute.ensure_unresolved()?;
        if *caller.account() != dispute.counterparty {
            return Err(DisputeError::WrongParty {
                dispute_id: id,
                expected: Party::Counterparty,
                caller: caller.account().clone(),
            });
        }
        if dispute.is_fully_staked() {
            return Err(DisputeError::AlreadyStaked(id));
        }
        let deadline = dispute.stake_deadline(&self.config)?;
        if tx.now() > deadline {
            return Err(DisputeError::StakeWindowExpired {
                dispute_id: id,
                deadline,
            });
        }
        let resolution_deadline = dispute.resolution_deadline(&self.config)?;
        if tx.now() > resolution_deadline {
            return Err(DisputeError::DeadlinePassed {
                dispute_id: id,
                deadline: resolution_deadline,
            });
        }

        let amount = dispute.initiator_stake;
        let subsidy = dispute.subsidy;
        let own_share = amount.checked_sub(subsidy)?;
        let counterparty = dispute.counterparty.clone();
        let escrow = self.accounts.escrow.clone();
        let fund = self.accounts.defense_fund.clone();
        self.move_value(tx, &counterparty, &escrow, own_share)?;
        self.move_value(tx, &fund, &escrow, subsidy)?;

        dispute.counterparty_stake = amount;
        let total = dispute.total_stake()?;
        self.store.write(StoreWrite::record(dispute))?;

        tx.emit(
            id,
            DisputeEvent::Staked {
                party: Party::Counterparty,
                account: counterparty,
                amount,
            },
        );
        tx.emit(
            id,
            DisputeEvent::FullyStaked {
                total,
                resolution_deadline,
            },
        );
        Ok(())
    }

    // ─── Proposal ────────────────────────────────────────────────────

    /// Record the oracle's signed proposal for the current round.
    pub fn submit_proposal(
        &mut self,
        caller: &Caller,
        id: DisputeId,
        proposal: SignedProposal,
    ) -> Result<(), DisputeError> {
        self.run("submit_proposal", |engine, tx| {
            engine.submit_in(tx, caller, id, proposal)
        })
    }

    fn submit_in(
        &mut self,
        tx: &mut Transaction,
        caller: &Caller,
        id: DisputeId,
        proposal: SignedProposal,
    ) -> Result<(), DisputeError> {
        if *caller.account() != self.oracle.account {
            return Err(DisputeError::NotOracle {
                caller: caller.account().clone(),
            });
        }
        let mut dispute = self.load(id)?;
        dispute.ensure_unresolved()?;
        if !dispute.is_fully_staked() {
            return Err(DisputeError::NotFullyStaked(id));
        }
        if dispute.proposal.is_some() {
            return Err(DisputeError::ProposalAlreadySubmitted(id));
        }
        if proposal.text.trim().is_empty() {
            return Err(DisputeError::EmptyProposal);
        }
        let deadline = dispute.resolution_deadline(&self.config)?;
        if tx.now() > deadline {
            return Err(DisputeError::DeadlinePassed {
                dispute_id: id,
                deadline,
            });
        }
        self.oracle
            .verify(id, &proposal)
            .map_err(|e| DisputeError::InvalidSignature {
                dispute_id: id,
                reason: e.to_string(),
            })?;
        if let Some(last) = self.store.last_oracle_nonce() {
            if proposal.nonce <= last {
                return Err(DisputeError::StaleNonce {
                    nonce: proposal.nonce,
                    last,
                });
            }
        }

        let binding = ProposalBinding::new(id, proposal.nonce, &proposal.text)
            .digest()
            .map_err(TruceError::from)?;
        let nonce = proposal.nonce;
        dispute.proposal = Some(Proposal {
            text: proposal.text,
            nonce,
            signature: proposal.signature,
            submitted_at: tx.now(),
        });
        self.store.write(StoreWrite {
            dispute,
            cooldown: None,
            oracle_nonce: Some(nonce),
        })?;

        tx.emit(id, DisputeEvent::ProposalSubmitted { nonce, binding });
        Ok(())
    }

    // ─── Acceptance ──────────────────────────────────────────────────

    /// Accept the standing proposal. The second acceptance resolves the
    /// dispute: both stakes are returned and the asset is released with the
    /// agreed terms. No fallback license is applied on this branch.
    pub fn accept_proposal(&mut self, caller: &Caller, id: DisputeId) -> Result<(), DisputeError> {
        self.run("accept_proposal", |engine, tx| engine.accept_in(tx, caller, id))
    }

    fn accept_in(&mut self, tx: &mut Transaction, caller: &Caller, id: DisputeId) -> Result<(), DisputeError> {
        let mut dispute = self.load(id)?;
        dispute.ensure_unresolved()?;
        let party = dispute
            .party_of(caller.account())
            .ok_or_else(|| DisputeError::NotAParty {
                dispute_id: id,
                caller: caller.account().clone(),
            })?;
        let text = match &dispute.proposal {
            Some(proposal) => proposal.text.clone(),
            None => return Err(DisputeError::NoProposal(id)),
        };
        let deadline = dispute.resolution_deadline(&self.config)?;
        if tx.now() > deadline {
            return Err(DisputeError::DeadlinePassed {
                dispute_id: id,
                deadline,
            });
        }
        if dispute.has_accepted(party) {
            return Err(DisputeError::AlreadyAccepted {
                dispute_id: id,
                party,
            });
        }

        dispute.set_accepted(party);
        tx.emit(id, DisputeEvent::ProposalAccepted { party });

        if dispute.both_accepted() {
            let settlement = policy::accepted_split(dispute.initiator_stake, dispute.counterparty_stake);
            self.resolve(
                tx,
                dispute,
                Resolution {
                    outcome: Outcome::AcceptedProposal,
                    settlement,
                    payload: ReleasePayload::AcceptedProposal { text },
                    apply_fallback: false,
                },
            )
        } else {
            self.store.write(StoreWrite::record(dispute))?;
            Ok(())
        }
    }

    // ─── Counter rounds ──────────────────────────────────────────────

    /// Reject the standing proposal (if any) and open a new round with
    /// replacement evidence. The round fee doubles each round and is
    /// burned; the resolution deadline is extended up to the configured cap.
    pub fn counter_propose(
        &mut self,
        caller: &Caller,
        id: DisputeId,
        request: CounterRequest,
    ) -> Result<(), DisputeError> {
        self.run("counter_propose", |engine, tx| {
            engine.counter_in(tx, caller, id, request)
        })
    }

    fn counter_in(
        &mut self,
        tx: &mut Transaction,
        caller: &Caller,
        id: DisputeId,
        request: CounterRequest,
    ) -> Result<(), DisputeError> {
        let mut dispute = self.load(id)?;
        dispute.ensure_unresolved()?;
        let account = caller.account().clone();
        let party = dispute.party_of(&account).ok_or_else(|| DisputeError::NotAParty {
            dispute_id: id,
            caller: account.clone(),
        })?;
        if !dispute.is_fully_staked() {
            return Err(DisputeError::NotFullyStaked(id));
        }
        let deadline = dispute.resolution_deadline(&self.config)?;
        if tx.now() > deadline {
            return Err(DisputeError::DeadlinePassed {
                dispute_id: id,
                deadline,
            });
        }
        let max = self.config.max_counters;
        let fee = policy::counter_fee(self.config.counter_base_fee, dispute.counter_count, max).map_err(
            |e| match e {
                PolicyError::CounterLimit { max, .. } => DisputeError::MaxCountersReached {
                    dispute_id: id,
                    max,
                },
                PolicyError::Arithmetic(e) => DisputeError::Arithmetic(e),
            },
        )?;
        if request.max_fee < fee {
            return Err(DisputeError::InsufficientFee {
                required: fee,
                offered: request.max_fee,
            });
        }

        let burn = self.accounts.burn_sink.clone();
        self.move_value(tx, &account, &burn, fee)?;
        let routed = if self.config.route_excess_fee_to_pool {
            let excess = request.max_fee.checked_sub(fee)?;
            let pool = self.accounts.fee_pool.clone();
            self.move_value(tx, &account, &pool, excess)?;
            excess
        } else {
            Amount::ZERO
        };

        let extension = policy::counter_extension(
            self.config.counter_extension_secs,
            dispute.cumulative_extension_secs,
            self.config.max_total_extension_secs,
        );
        dispute.begin_counter_round(request.evidence.clone(), extension)?;
        let round = dispute.counter_count;
        let resolution_deadline = dispute.resolution_deadline(&self.config)?;
        self.store.write(StoreWrite::record(dispute))?;

        tx.emit(
            id,
            DisputeEvent::FeeBurned {
                account,
                amount: fee,
                routed_to_pool: routed,
            },
        );
        tx.emit(
            id,
            DisputeEvent::CounterProposed {
                party,
                round,
                evidence: request.evidence,
                extension_secs: extension,
                resolution_deadline,
            },
        );
        Ok(())
    }
}
