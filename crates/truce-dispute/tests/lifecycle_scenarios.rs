//! # Dispute Lifecycle Scenarios
//!
//! End-to-end flows through the engine with in-memory collaborators:
//! each resolution branch, the staking and proposal guards, counter-round
//! economics, cooldown escalation, reserve policies and the defense
//! subsidy.

mod common;

use common::{acct, evidence, fallback, Harness, START_BALANCE};
use truce_core::{Amount, DisputeId};
use truce_dispute::{
    CounterRequest, DisputeError, DisputeStage, EngineConfig, InitiateRequest, Ledger, Outcome,
    RegistryCall, ReleasePayload, ReservePolicy, Treasury,
};

const DAY: u64 = 86_400;
const STAKE_WINDOW: u64 = 7 * DAY;
const RESOLUTION_TIMEOUT: u64 = 14 * DAY;

fn counter(h: &mut Harness, who: &truce_core::AccountId, id: DisputeId, max_fee: u64) -> Result<(), DisputeError> {
    h.engine.counter_propose(
        &Harness::caller(who),
        id,
        CounterRequest {
            evidence: evidence("counter"),
            max_fee: Amount::new(max_fee),
        },
    )
}

// ---------------------------------------------------------------------------
// 1. Mutual acceptance
// ---------------------------------------------------------------------------

#[test]
fn mutual_acceptance_returns_both_stakes() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());

    let id = h.open_staked(100);
    assert_eq!(id, DisputeId::GENESIS);
    assert_eq!(h.escrow(), 200);

    h.propose(id, "non-exclusive, 3% royalty, 2 years").unwrap();
    assert_eq!(h.engine.stage(id).unwrap(), DisputeStage::ProposalReady);

    h.accept(&alice, id).unwrap();
    assert_eq!(h.engine.stage(id).unwrap(), DisputeStage::ProposalReady);
    h.accept(&bob, id).unwrap();

    assert_eq!(
        h.engine.stage(id).unwrap(),
        DisputeStage::Resolved(Outcome::AcceptedProposal)
    );
    assert_eq!(h.balance(&alice), START_BALANCE);
    assert_eq!(h.balance(&bob), START_BALANCE);
    assert_eq!(h.escrow(), 0);
    assert_eq!(h.burned(), 0);
    h.assert_supply_conserved();

    assert_eq!(
        h.engine.registry().release_of(id),
        Some(&ReleasePayload::AcceptedProposal {
            text: "non-exclusive, 3% royalty, 2 years".to_string()
        })
    );
    assert_eq!(
        h.engine.registry().fallback_of(id),
        None,
        "accepted proposals never apply the fallback license"
    );
    assert_eq!(
        h.event_names(id),
        vec![
            "dispute_created",
            "staked",
            "staked",
            "fully_staked",
            "proposal_submitted",
            "proposal_accepted",
            "proposal_accepted",
            "resolved",
        ]
    );
}

#[test]
fn mutual_acceptance_counterparty_first() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let id = h.open_staked(100);
    h.propose(id, "exclusive field-of-use, 5%").unwrap();

    h.accept(&bob, id).unwrap();
    assert_eq!(h.engine.stage(id).unwrap(), DisputeStage::ProposalReady);
    assert!(matches!(
        h.accept(&bob, id),
        Err(DisputeError::AlreadyAccepted { .. })
    ));
    h.accept(&alice, id).unwrap();

    assert_eq!(
        h.engine.stage(id).unwrap(),
        DisputeStage::Resolved(Outcome::AcceptedProposal)
    );
    assert_eq!(h.balance(&alice), START_BALANCE);
    assert_eq!(h.balance(&bob), START_BALANCE);
    assert_eq!(h.escrow(), 0);
    assert_eq!(h.engine.registry().fallback_of(id), None);
    h.assert_supply_conserved();
}

#[test]
fn accept_guards() {
    let mut h = Harness::new();
    let (alice, carol) = (h.alice.clone(), h.carol.clone());
    let id = h.open_staked(50);

    assert!(matches!(h.accept(&alice, id), Err(DisputeError::NoProposal(_))));
    h.propose(id, "terms").unwrap();
    assert!(matches!(h.accept(&carol, id), Err(DisputeError::NotAParty { .. })));
    h.accept(&alice, id).unwrap();
    assert!(matches!(
        h.accept(&alice, id),
        Err(DisputeError::AlreadyAccepted { .. })
    ));
}

#[test]
fn accept_after_deadline_rejected() {
    let mut h = Harness::new();
    let alice = h.alice.clone();
    let id = h.open_staked(50);
    h.propose(id, "terms").unwrap();
    h.advance(RESOLUTION_TIMEOUT + 1);
    assert!(matches!(
        h.accept(&alice, id),
        Err(DisputeError::DeadlinePassed { .. })
    ));
}

// ---------------------------------------------------------------------------
// 2. Silent counterparty
// ---------------------------------------------------------------------------

#[test]
fn silent_counterparty_gets_default_license() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let id = h.open(&alice, &bob, 100);

    h.advance(STAKE_WINDOW);
    let err = h
        .engine
        .enforce_timeout(&Harness::caller(&bob), id)
        .unwrap_err();
    assert!(
        matches!(err, DisputeError::TooEarly { .. }),
        "the stake window is inclusive of its last second"
    );

    h.advance(1);
    let outcome = h.engine.enforce_timeout(&Harness::caller(&bob), id).unwrap();
    assert_eq!(outcome, Outcome::DefaultLicenseApplied);

    assert_eq!(h.balance(&alice), START_BALANCE + 10, "stake back plus 10% incentive");
    assert_eq!(h.reserve(), common::RESERVE_BALANCE - 10);
    assert_eq!(h.escrow(), 0);
    h.assert_supply_conserved();

    assert_eq!(
        h.engine.registry().fallback_of(id),
        Some("terms://fallback/standard-v1")
    );
    assert_eq!(
        h.event_names(id),
        vec![
            "dispute_created",
            "staked",
            "incentive_paid",
            "fallback_license_applied",
            "resolved",
        ]
    );
}

#[test]
fn short_reserve_pays_no_incentive() {
    let mut h = Harness::build(EngineConfig::default(), 9);
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let id = h.open(&alice, &bob, 100);
    h.advance(STAKE_WINDOW + 1);
    h.engine.enforce_timeout(&Harness::caller(&alice), id).unwrap();

    assert_eq!(h.balance(&alice), START_BALANCE, "incentive is all or nothing");
    assert_eq!(h.reserve(), 9);
    assert!(h.event_names(id).contains(&"incentive_skipped"));
    h.assert_supply_conserved();
}

#[test]
fn deposit_guards() {
    let mut h = Harness::new();
    let (alice, bob, carol) = (h.alice.clone(), h.bob.clone(), h.carol.clone());
    let id = h.open(&alice, &bob, 100);

    assert!(matches!(
        h.engine.deposit_counterparty_stake(&Harness::caller(&carol), id),
        Err(DisputeError::WrongParty { .. })
    ));
    assert!(matches!(
        h.engine.deposit_counterparty_stake(&Harness::caller(&alice), id),
        Err(DisputeError::WrongParty { .. })
    ));
    h.engine
        .deposit_counterparty_stake(&Harness::caller(&bob), id)
        .unwrap();
    assert!(matches!(
        h.engine.deposit_counterparty_stake(&Harness::caller(&bob), id),
        Err(DisputeError::AlreadyStaked(_))
    ));

    let late = h.open(&carol, &bob, 10);
    h.advance(STAKE_WINDOW + 1);
    assert!(matches!(
        h.engine.deposit_counterparty_stake(&Harness::caller(&bob), late),
        Err(DisputeError::StakeWindowExpired { .. })
    ));
}

#[test]
fn resolution_timeout_must_outlast_stake_window() {
    for timeout in [DAY, STAKE_WINDOW] {
        let config = EngineConfig {
            stake_window_secs: STAKE_WINDOW,
            resolution_timeout_secs: timeout,
            ..EngineConfig::default()
        };
        assert!(
            matches!(
                Harness::try_build(config, common::RESERVE_BALANCE),
                Err(DisputeError::Config(_))
            ),
            "a counterparty could stake after the resolution deadline and force a burn"
        );
    }

    let config = EngineConfig {
        stake_window_secs: STAKE_WINDOW,
        resolution_timeout_secs: STAKE_WINDOW + 1,
        ..EngineConfig::default()
    };
    let mut h = Harness::with_config(config);
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let id = h.open(&alice, &bob, 1_000);
    h.advance(STAKE_WINDOW);
    h.engine
        .deposit_counterparty_stake(&Harness::caller(&bob), id)
        .unwrap();
    assert!(matches!(
        h.engine.enforce_timeout(&Harness::caller(&bob), id),
        Err(DisputeError::TooEarly { .. })
    ));
    h.propose(id, "last-second terms").unwrap();
}

// ---------------------------------------------------------------------------
// 3. Deadlock timeout
// ---------------------------------------------------------------------------

#[test]
fn deadlock_burns_half_and_splits_rest() {
    let mut h = Harness::new();
    let (alice, bob, carol) = (h.alice.clone(), h.bob.clone(), h.carol.clone());
    let id = h.open_staked(101);

    h.advance(RESOLUTION_TIMEOUT);
    assert!(matches!(
        h.engine.enforce_timeout(&Harness::caller(&carol), id),
        Err(DisputeError::TooEarly { .. })
    ));
    h.advance(1);
    let outcome = h.engine.enforce_timeout(&Harness::caller(&carol), id).unwrap();
    assert_eq!(outcome, Outcome::TimeoutWithBurn);

    // 202 staked: 101 burned, 101 split as 50 + 50 with 1 unit of dust.
    assert_eq!(h.balance(&alice), START_BALANCE - 101 + 50);
    assert_eq!(h.balance(&bob), START_BALANCE - 101 + 50);
    assert_eq!(h.burned(), 102);
    assert_eq!(h.escrow(), 0);
    h.assert_supply_conserved();

    let record = h.engine.dispute(id).unwrap();
    let settlement = record.settlement.unwrap();
    assert_eq!(settlement.burned, Amount::new(101));
    assert_eq!(settlement.dust, Amount::new(1));
    assert!(settlement.conserves(Amount::new(202)));
    assert_eq!(
        h.engine.registry().release_of(id),
        Some(&ReleasePayload::TimeoutWithBurn {
            terms_ref: "terms://fallback/standard-v1".to_string()
        })
    );
}

// ---------------------------------------------------------------------------
// 4. Exactly-once resolution
// ---------------------------------------------------------------------------

#[test]
fn resolution_happens_exactly_once() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let id = h.open_staked(100);
    h.propose(id, "terms").unwrap();
    h.advance(RESOLUTION_TIMEOUT + 1);
    h.engine.enforce_timeout(&Harness::caller(&alice), id).unwrap();

    let events_before = h.engine.events().len();
    let balances_before = (h.balance(&alice), h.balance(&bob), h.burned());

    assert!(matches!(
        h.engine.enforce_timeout(&Harness::caller(&alice), id),
        Err(DisputeError::AlreadyResolved {
            outcome: Outcome::TimeoutWithBurn,
            ..
        })
    ));
    assert!(matches!(
        h.accept(&bob, id),
        Err(DisputeError::AlreadyResolved { .. })
    ));
    assert!(matches!(
        counter(&mut h, &bob, id, 1_000),
        Err(DisputeError::AlreadyResolved { .. })
    ));

    assert_eq!(h.engine.events().len(), events_before, "failed calls emit nothing");
    assert_eq!(
        (h.balance(&alice), h.balance(&bob), h.burned()),
        balances_before
    );

    let calls = h.engine.registry().calls_for(id);
    assert_eq!(calls.len(), 3);
    assert!(matches!(calls[0], RegistryCall::Freeze { .. }));
    assert!(matches!(calls[1], RegistryCall::Unfreeze { .. }));
    assert!(matches!(calls[2], RegistryCall::ApplyFallback { .. }));
}

// ---------------------------------------------------------------------------
// 5. Initiation guards and cooldown escalation
// ---------------------------------------------------------------------------

#[test]
fn initiation_guards() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());

    assert!(matches!(
        h.try_open(&alice, &alice, 10),
        Err(DisputeError::InvalidCounterparty(_))
    ));
    assert!(matches!(h.try_open(&alice, &bob, 0), Err(DisputeError::ZeroStake)));

    let mut exclusive = fallback();
    exclusive.exclusive = true;
    let err = h
        .engine
        .initiate(
            &Harness::caller(&alice),
            InitiateRequest {
                counterparty: bob.clone(),
                stake: Amount::new(10),
                evidence: evidence("x"),
                fallback: exclusive,
            },
        )
        .unwrap_err();
    assert!(matches!(err, DisputeError::ExclusiveFallback));

    assert!(matches!(
        h.try_open(&alice, &bob, START_BALANCE + 1),
        Err(DisputeError::Ledger(_))
    ));

    assert_eq!(h.engine.dispute_count(), 0, "rejected initiations allocate no id");
    assert!(h.engine.events().is_empty());
    assert_eq!(h.balance(&alice), START_BALANCE);
    assert_eq!(h.open(&alice, &bob, 10), DisputeId::GENESIS);
}

#[test]
fn repeat_filing_inside_cooldown_is_escalated_and_matched() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());

    let first = h.open(&alice, &bob, 100);
    assert!(!h.engine.dispute(first).unwrap().escalated);

    h.advance(DAY);
    let second = h.open(&alice, &bob, 100);
    let record = h.engine.dispute(second).unwrap();
    assert!(record.escalated);
    assert_eq!(record.base_stake, Amount::new(100));
    assert_eq!(record.initiator_stake, Amount::new(150));
    assert_eq!(h.engine.treasury().harassment_score(&alice), 1);

    h.engine
        .deposit_counterparty_stake(&Harness::caller(&bob), second)
        .unwrap();
    assert_eq!(
        h.engine.dispute(second).unwrap().counterparty_stake,
        Amount::new(150),
        "counterparty matches the escalated stake"
    );

    // The cooldown is directional.
    let reverse = h.open(&bob, &alice, 100);
    assert!(!h.engine.dispute(reverse).unwrap().escalated);
}

#[test]
fn cooldown_window_is_half_open() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let cooldown = h.engine.config().cooldown_secs;

    h.open(&alice, &bob, 100);
    h.advance(cooldown - 1);
    let inside = h.open(&alice, &bob, 100);
    assert!(h.engine.dispute(inside).unwrap().escalated);

    // The window restarts at the latest filing.
    h.advance(cooldown);
    let outside = h.open(&alice, &bob, 100);
    assert!(!h.engine.dispute(outside).unwrap().escalated);
}

// ---------------------------------------------------------------------------
// 6. Proposals and nonces
// ---------------------------------------------------------------------------

#[test]
fn proposal_guards() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let id = h.open(&alice, &bob, 100);

    assert!(matches!(
        h.propose(id, "too early"),
        Err(DisputeError::NotFullyStaked(_))
    ));
    h.engine
        .deposit_counterparty_stake(&Harness::caller(&bob), id)
        .unwrap();

    let signed = h.oracle.sign(id, 500, "terms").unwrap();
    assert!(matches!(
        h.engine.submit_proposal(&Harness::caller(&alice), id, signed),
        Err(DisputeError::NotOracle { .. })
    ));
    assert!(matches!(h.propose(id, "   "), Err(DisputeError::EmptyProposal)));

    h.propose(id, "terms").unwrap();
    assert!(matches!(
        h.propose(id, "other terms"),
        Err(DisputeError::ProposalAlreadySubmitted(_))
    ));
}

#[test]
fn signature_bound_to_dispute() {
    let mut h = Harness::new();
    let first = h.open_staked(10);
    let second = h.open_staked(10);

    let for_second = h.oracle.sign(second, 1, "terms").unwrap();
    let oracle = Harness::caller(h.oracle.account());
    assert!(matches!(
        h.engine.submit_proposal(&oracle, first, for_second.clone()),
        Err(DisputeError::InvalidSignature { .. })
    ));
    h.engine.submit_proposal(&oracle, second, for_second).unwrap();
}

#[test]
fn replayed_proposal_rejected_after_counter() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let id = h.open_staked(100);

    let signed = h.oracle.sign(id, 7, "3% royalty").unwrap();
    let oracle = Harness::caller(h.oracle.account());
    h.engine.submit_proposal(&oracle, id, signed.clone()).unwrap();
    h.accept(&alice, id).unwrap();

    counter(&mut h, &bob, id, 10).unwrap();
    let record = h.engine.dispute(id).unwrap();
    assert!(record.proposal.is_none());
    assert!(!record.initiator_accepted, "counter clears acceptances");
    assert_eq!(h.engine.stage(id).unwrap(), DisputeStage::ProposalPending);

    assert!(matches!(
        h.engine.submit_proposal(&oracle, id, signed),
        Err(DisputeError::StaleNonce { nonce: 7, last: 7 })
    ));
    let fresh = h.oracle.sign(id, 8, "2% royalty").unwrap();
    h.engine.submit_proposal(&oracle, id, fresh).unwrap();
}

#[test]
fn proposal_after_deadline_rejected() {
    let mut h = Harness::new();
    let id = h.open_staked(10);
    h.advance(RESOLUTION_TIMEOUT + 1);
    assert!(matches!(
        h.propose(id, "late"),
        Err(DisputeError::DeadlinePassed { .. })
    ));
}

// ---------------------------------------------------------------------------
// 7. Counter rounds
// ---------------------------------------------------------------------------

#[test]
fn counter_fees_double_and_deadline_extension_is_capped() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let id = h.open_staked(100);
    let base_deadline = h.engine.resolution_deadline(id).unwrap().epoch_secs();

    counter(&mut h, &alice, id, 10).unwrap();
    assert_eq!(
        h.engine.resolution_deadline(id).unwrap().epoch_secs(),
        base_deadline + 2 * DAY as i64
    );
    counter(&mut h, &bob, id, 20).unwrap();
    assert_eq!(
        h.engine.resolution_deadline(id).unwrap().epoch_secs(),
        base_deadline + 3 * DAY as i64,
        "second round only gets what is left under the cap"
    );
    counter(&mut h, &alice, id, 40).unwrap();
    assert_eq!(
        h.engine.resolution_deadline(id).unwrap().epoch_secs(),
        base_deadline + 3 * DAY as i64
    );

    assert!(matches!(
        counter(&mut h, &bob, id, 1_000),
        Err(DisputeError::MaxCountersReached { max: 3, .. })
    ));
    assert_eq!(h.burned(), 10 + 20 + 40);
    assert_eq!(h.balance(&alice), START_BALANCE - 100 - 10 - 40);
    assert_eq!(h.balance(&bob), START_BALANCE - 100 - 20);
    assert_eq!(h.engine.dispute(id).unwrap().counter_count, 3);
    h.assert_supply_conserved();
}

#[test]
fn counter_fee_must_be_covered() {
    let mut h = Harness::new();
    let (alice, carol) = (h.alice.clone(), h.carol.clone());
    let id = h.open_staked(100);

    assert!(matches!(
        counter(&mut h, &alice, id, 9),
        Err(DisputeError::InsufficientFee { required, offered })
            if required == Amount::new(10) && offered == Amount::new(9)
    ));
    assert!(matches!(
        counter(&mut h, &carol, id, 100),
        Err(DisputeError::NotAParty { .. })
    ));

    counter(&mut h, &alice, id, 1_000).unwrap();
    assert_eq!(
        h.balance(&alice),
        START_BALANCE - 100 - 10,
        "over-payment stays with the caller by default"
    );
}

#[test]
fn excess_fee_routed_to_pool_when_enabled() {
    let mut h = Harness::with_config(EngineConfig {
        route_excess_fee_to_pool: true,
        ..EngineConfig::default()
    });
    let alice = h.alice.clone();
    let id = h.open_staked(100);
    counter(&mut h, &alice, id, 25).unwrap();

    let pool = h.engine.system_accounts().fee_pool.clone();
    assert_eq!(h.burned(), 10);
    assert_eq!(h.balance(&pool), 15);
    assert_eq!(h.balance(&alice), START_BALANCE - 100 - 25);
    h.assert_supply_conserved();
}

#[test]
fn counter_requires_both_stakes_and_open_deadline() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let id = h.open(&alice, &bob, 100);
    assert!(matches!(
        counter(&mut h, &alice, id, 10),
        Err(DisputeError::NotFullyStaked(_))
    ));
    h.engine
        .deposit_counterparty_stake(&Harness::caller(&bob), id)
        .unwrap();
    h.advance(RESOLUTION_TIMEOUT + 1);
    assert!(matches!(
        counter(&mut h, &alice, id, 10),
        Err(DisputeError::DeadlinePassed { .. })
    ));
}

// ---------------------------------------------------------------------------
// 8. Earmarked reserve policy
// ---------------------------------------------------------------------------

#[test]
fn earmarked_incentive_is_reserved_then_returned() {
    let mut h = Harness::with_config(EngineConfig {
        reserve_policy: ReservePolicy::Earmarked,
        ..EngineConfig::default()
    });
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let earmark = h.engine.system_accounts().incentive_earmark.clone();

    let id = h.open_staked(100);
    assert_eq!(h.reserve(), common::RESERVE_BALANCE - 10);
    assert_eq!(h.balance(&earmark), 10);

    h.propose(id, "terms").unwrap();
    h.accept(&alice, id).unwrap();
    h.accept(&bob, id).unwrap();
    assert_eq!(h.reserve(), common::RESERVE_BALANCE);
    assert_eq!(h.balance(&earmark), 0);
    h.assert_supply_conserved();
}

#[test]
fn earmarked_incentive_paid_on_default() {
    let mut h = Harness::with_config(EngineConfig {
        reserve_policy: ReservePolicy::Earmarked,
        ..EngineConfig::default()
    });
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let id = h.open(&alice, &bob, 100);

    // Draining the shared reserve afterwards does not affect this dispute.
    let reserve = h.engine.treasury().reserve_account().clone();
    let drained = h.reserve();
    h.engine
        .ledger_mut()
        .transfer(&reserve, &acct("dave"), Amount::new(drained))
        .unwrap();

    h.advance(STAKE_WINDOW + 1);
    h.engine.enforce_timeout(&Harness::caller(&bob), id).unwrap();
    assert_eq!(h.balance(&alice), START_BALANCE + 10);
    h.assert_supply_conserved();
}

// ---------------------------------------------------------------------------
// 9. Defense subsidy
// ---------------------------------------------------------------------------

#[test]
fn defense_subsidy_scales_with_harassment() {
    let mut h = Harness::new();
    let (alice, bob, carol) = (h.alice.clone(), h.bob.clone(), h.carol.clone());

    h.open(&alice, &bob, 100);
    let repeat = h.open(&alice, &bob, 100);
    assert_eq!(h.engine.dispute(repeat).unwrap().initiator_stake, Amount::new(150));

    assert!(matches!(
        h.engine.request_defense_subsidy(&Harness::caller(&alice), repeat),
        Err(DisputeError::SubsidyRefused { .. })
    ));
    assert!(matches!(
        h.engine.request_defense_subsidy(&Harness::caller(&carol), repeat),
        Err(DisputeError::NotAParty { .. })
    ));

    // score 1: 500 bps * 2 = 10% of 150.
    let granted = h
        .engine
        .request_defense_subsidy(&Harness::caller(&bob), repeat)
        .unwrap();
    assert_eq!(granted, Amount::new(15));
    assert_eq!(h.balance(&bob), START_BALANCE, "subsidy is held, not paid out");
    assert_eq!(h.defense_fund(), 15);
    assert!(matches!(
        h.engine.request_defense_subsidy(&Harness::caller(&bob), repeat),
        Err(DisputeError::SubsidyRefused { .. })
    ));

    h.engine
        .deposit_counterparty_stake(&Harness::caller(&bob), repeat)
        .unwrap();
    assert_eq!(h.balance(&bob), START_BALANCE - 135);
    assert_eq!(h.defense_fund(), 0);
    assert_eq!(h.escrow(), 100 + 150 + 150);
    assert_eq!(
        h.engine.dispute(repeat).unwrap().counterparty_stake,
        Amount::new(150)
    );
    h.assert_supply_conserved();
}

#[test]
fn unused_subsidy_returns_to_reserve() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let id = h.open(&alice, &bob, 100);

    // score 0: base rate, 5% of 100.
    let granted = h
        .engine
        .request_defense_subsidy(&Harness::caller(&bob), id)
        .unwrap();
    assert_eq!(granted, Amount::new(5));
    assert_eq!(h.reserve(), common::RESERVE_BALANCE - 5);

    h.advance(STAKE_WINDOW + 1);
    let outcome = h.engine.enforce_timeout(&Harness::caller(&bob), id).unwrap();
    assert_eq!(outcome, Outcome::DefaultLicenseApplied);

    assert_eq!(h.balance(&bob), START_BALANCE, "a silent counterparty keeps nothing");
    assert_eq!(h.balance(&alice), START_BALANCE + 10);
    assert_eq!(h.defense_fund(), 0);
    assert_eq!(h.reserve(), common::RESERVE_BALANCE - 10);
    assert_eq!(
        h.event_names(id),
        vec![
            "dispute_created",
            "staked",
            "subsidy_granted",
            "subsidy_returned",
            "incentive_paid",
            "fallback_license_applied",
            "resolved",
        ]
    );
    h.assert_supply_conserved();
}

// ---------------------------------------------------------------------------
// 10. Queries
// ---------------------------------------------------------------------------

#[test]
fn queries_report_roles_and_deadlines() {
    let mut h = Harness::new();
    let (alice, bob) = (h.alice.clone(), h.bob.clone());
    let id = h.open(&alice, &bob, 100);

    let roles = h.engine.roles(id).unwrap();
    assert_eq!(roles.initiator, alice);
    assert_eq!(roles.counterparty, bob);
    assert_eq!(
        h.engine.stake_deadline(id).unwrap().epoch_secs(),
        h.now_secs() + STAKE_WINDOW as i64
    );
    assert_eq!(
        h.engine.resolution_deadline(id).unwrap().epoch_secs(),
        h.now_secs() + RESOLUTION_TIMEOUT as i64
    );
    assert_eq!(h.engine.dispute_count(), 1);
    assert!(matches!(
        h.engine.dispute(DisputeId(99)),
        Err(DisputeError::NotFound(_))
    ));
}
