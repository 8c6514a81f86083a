//! # Failure Atomicity
//!
//! Collaborator failures injected at each step of initiation and
//! resolution. A failed operation must leave balances, records, registry
//! state, harassment scores and the event log exactly as they were.

mod common;

use common::{Harness, START_BALANCE};
use truce_core::{Amount, DisputeId};
use truce_dispute::{
    DisputeError, DisputeStage, EngineConfig, Outcome, RegistryFaults, ReleasePayload, Treasury,
    UnfreezePolicy,
};

const DAY: u64 = 86_400;

fn past_resolution_deadline(h: &Harness) {
    h.advance(14 * DAY + 1);
}

// ---------------------------------------------------------------------------
// 1. Initiation
// ---------------------------------------------------------------------------

#[test]
fn freeze_failure_refunds_stake() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    h.engine.registry_mut().set_faults(RegistryFaults {
        freeze: true,
        ..RegistryFaults::default()
    });

    let err = h.try_open(&alice, &bob, 100).unwrap_err();
    assert!(matches!(err, DisputeError::Registry(_)));
    assert_eq!(h.balance(&alice), START_BALANCE);
    assert_eq!(h.escrow(), 0);
    assert_eq!(h.engine.dispute_count(), 0);
    assert!(h.engine.events().is_empty());
    h.assert_supply_conserved();

    h.engine.registry_mut().set_faults(RegistryFaults::default());
    assert_eq!(h.open(&alice, &bob, 100), DisputeId::GENESIS);
}

#[test]
fn store_failure_undoes_freeze_escalation_and_earmark() {
    let mut h = Harness::with_config(EngineConfig {
        reserve_policy: truce_dispute::ReservePolicy::Earmarked,
        ..EngineConfig::default()
    });
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    h.open(&alice, &bob, 100);
    let alice_before = h.balance(&alice);
    let reserve_before = h.reserve();
    let events_before = h.engine.events().len();

    h.engine.store_mut().refuse_writes(true);
    let err = h.try_open(&alice, &bob, 100).unwrap_err();
    assert!(matches!(err, DisputeError::Store(_)));

    assert_eq!(h.balance(&alice), alice_before);
    assert_eq!(h.reserve(), reserve_before);
    assert_eq!(
        h.engine.treasury().harassment_score(&alice),
        0,
        "escalation bump is reverted"
    );
    assert!(!h.engine.registry().is_frozen(DisputeId(2)));
    assert_eq!(
        h.engine.registry().release_of(DisputeId(2)),
        Some(&ReleasePayload::Aborted)
    );
    assert_eq!(h.engine.dispute_count(), 1);
    assert_eq!(h.engine.events().len(), events_before);
    h.assert_supply_conserved();
}

// ---------------------------------------------------------------------------
// 2. Resolution under the strict unfreeze policy
// ---------------------------------------------------------------------------

#[test]
fn strict_unfreeze_failure_aborts_resolution() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let id = h.open(&alice, &bob, 100);
    h.advance(7 * DAY + 1);

    h.engine.registry_mut().set_faults(RegistryFaults {
        unfreeze: true,
        ..RegistryFaults::default()
    });
    let events_before = h.engine.events().len();
    let err = h.engine.enforce_timeout(&Harness::caller(&bob), id).unwrap_err();
    assert!(matches!(err, DisputeError::Registry(_)));

    assert_eq!(h.engine.stage(id).unwrap(), DisputeStage::Staked);
    assert_eq!(h.balance(&alice), START_BALANCE - 100);
    assert_eq!(h.reserve(), common::RESERVE_BALANCE, "incentive payment reversed");
    assert_eq!(h.escrow(), 100);
    assert!(h.engine.registry().is_frozen(id));
    assert_eq!(h.engine.events().len(), events_before);
    h.assert_supply_conserved();

    h.engine.registry_mut().set_faults(RegistryFaults::default());
    assert_eq!(
        h.engine.enforce_timeout(&Harness::caller(&bob), id).unwrap(),
        Outcome::DefaultLicenseApplied
    );
    assert_eq!(h.balance(&alice), START_BALANCE + 10);
}

#[test]
fn fallback_failure_refreezes_and_restores_record() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let id = h.open_staked(100);
    past_resolution_deadline(&h);

    h.engine.registry_mut().set_faults(RegistryFaults {
        apply_fallback: true,
        ..RegistryFaults::default()
    });
    let err = h.engine.enforce_timeout(&Harness::caller(&alice), id).unwrap_err();
    assert!(matches!(err, DisputeError::Registry(_)));

    let record = h.engine.dispute(id).unwrap();
    assert!(!record.resolved);
    assert_eq!(record.outcome, Outcome::Pending);
    assert!(record.settlement.is_none());
    assert!(h.engine.registry().is_frozen(id), "release compensated by re-freeze");
    assert_eq!(h.escrow(), 200);
    assert_eq!(h.burned(), 0);
    assert_eq!(h.balance(&alice), START_BALANCE - 100);
    assert_eq!(h.balance(&bob), START_BALANCE - 100);
    h.assert_supply_conserved();

    h.engine.registry_mut().set_faults(RegistryFaults::default());
    h.engine.enforce_timeout(&Harness::caller(&alice), id).unwrap();
    assert_eq!(h.burned(), 100);
    assert_eq!(
        h.engine.registry().fallback_of(id),
        Some("terms://fallback/standard-v1")
    );
}

#[test]
fn ledger_failure_mid_payout_reverses_earlier_payouts() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let id = h.open_staked(100);
    past_resolution_deadline(&h);

    let sink = h.engine.system_accounts().burn_sink.clone();
    h.engine.ledger_mut().refuse_credits_to(Some(sink));
    let err = h.engine.enforce_timeout(&Harness::caller(&alice), id).unwrap_err();
    assert!(matches!(err, DisputeError::Ledger(_)));

    assert_eq!(h.balance(&alice), START_BALANCE - 100);
    assert_eq!(h.balance(&bob), START_BALANCE - 100);
    assert_eq!(h.escrow(), 200);
    assert_eq!(h.engine.stage(id).unwrap(), DisputeStage::ProposalPending);
    h.assert_supply_conserved();
}

#[test]
fn counter_store_failure_refunds_fee() {
    let mut h = Harness::new();
    let alice = h.alice.clone();
    let id = h.open_staked(100);

    h.engine.store_mut().refuse_writes(true);
    let err = h
        .engine
        .counter_propose(
            &Harness::caller(&alice),
            id,
            truce_dispute::CounterRequest {
                evidence: common::evidence("counter"),
                max_fee: Amount::new(10),
            },
        )
        .unwrap_err();
    assert!(matches!(err, DisputeError::Store(_)));
    assert_eq!(h.burned(), 0);
    assert_eq!(h.balance(&alice), START_BALANCE - 100);
    h.engine.store_mut().refuse_writes(false);
    assert_eq!(h.engine.dispute(id).unwrap().counter_count, 0);
}

// ---------------------------------------------------------------------------
// 3. Best-effort unfreeze
// ---------------------------------------------------------------------------

#[test]
fn best_effort_parks_release_and_retries() {
    let mut h = Harness::with_config(EngineConfig {
        unfreeze_policy: UnfreezePolicy::BestEffort,
        ..EngineConfig::default()
    });
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let id = h.open_staked(100);
    h.propose(id, "terms").unwrap();
    h.accept(&alice, id).unwrap();

    h.engine.registry_mut().set_faults(RegistryFaults {
        unfreeze: true,
        ..RegistryFaults::default()
    });
    h.accept(&bob, id).unwrap();

    let record = h.engine.dispute(id).unwrap();
    assert_eq!(record.stage(), DisputeStage::Resolved(Outcome::AcceptedProposal));
    assert!(record.pending_release.is_some());
    assert_eq!(h.balance(&alice), START_BALANCE, "value settles regardless of release");
    assert!(h.engine.registry().is_frozen(id));
    assert!(h.event_names(id).contains(&"release_pending"));

    assert!(matches!(
        h.engine.retry_release(&Harness::caller(&bob), id),
        Err(DisputeError::Registry(_))
    ));
    assert!(h.engine.dispute(id).unwrap().pending_release.is_some());

    h.engine.registry_mut().set_faults(RegistryFaults::default());
    h.engine.retry_release(&Harness::caller(&bob), id).unwrap();
    assert!(!h.engine.registry().is_frozen(id));
    assert!(h.engine.dispute(id).unwrap().pending_release.is_none());
    assert_eq!(h.event_names(id).last(), Some(&"release_completed"));

    assert!(matches!(
        h.engine.retry_release(&Harness::caller(&bob), id),
        Err(DisputeError::NoPendingRelease(_))
    ));
    h.assert_supply_conserved();
}

#[test]
fn retry_on_unresolved_dispute_rejected() {
    let mut h = Harness::new();
    let id = h.open_staked(10);
    let alice = h.alice.clone();
    assert!(matches!(
        h.engine.retry_release(&Harness::caller(&alice), id),
        Err(DisputeError::NoPendingRelease(_))
    ));
}
