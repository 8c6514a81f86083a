//! Shared fixture for dispute engine integration tests.

#![allow(dead_code)]

use truce_core::{sha256_digest, AccountId, Amount, CanonicalBytes, ContentDigest, DisputeId};
use truce_crypto::Ed25519KeyPair;
use truce_dispute::{
    Caller, Clock, DisputeEngine, DisputeError, EngineConfig, FallbackLicense, InMemoryAssetRegistry,
    InMemoryDisputeStore, InMemoryEngine, InMemoryLedger, InMemoryTreasury, InitiateRequest, Ledger,
    ManualClock, OracleSigner, Treasury,
};

pub const START_BALANCE: u64 = 1_000_000;
pub const RESERVE_BALANCE: u64 = 10_000;
/// 2026-01-01T00:00:00Z
pub const GENESIS_TIME: i64 = 1_767_225_600;

pub fn acct(name: &str) -> AccountId {
    AccountId::new(name).unwrap()
}

pub fn evidence(tag: &str) -> ContentDigest {
    sha256_digest(&CanonicalBytes::new(&serde_json::json!({ "bundle": tag })).unwrap())
}

pub fn fallback() -> FallbackLicense {
    FallbackLicense::non_exclusive("terms://fallback/standard-v1", 31_536_000, 300)
}

pub struct Harness {
    pub engine: InMemoryEngine,
    pub clock: ManualClock,
    pub oracle: OracleSigner,
    pub nonce: u64,
    pub alice: AccountId,
    pub bob: AccountId,
    pub carol: AccountId,
    initial_supply: u128,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(EngineConfig::default(), RESERVE_BALANCE)
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::build(config, RESERVE_BALANCE)
    }

    pub fn build(config: EngineConfig, reserve_balance: u64) -> Self {
        Self::try_build(config, reserve_balance).unwrap()
    }

    pub fn try_build(config: EngineConfig, reserve_balance: u64) -> Result<Self, DisputeError> {
        let alice = acct("alice");
        let bob = acct("bob");
        let carol = acct("carol");
        let treasury = InMemoryTreasury::default();
        let ledger = InMemoryLedger::with_balances([
            (alice.clone(), Amount::new(START_BALANCE)),
            (bob.clone(), Amount::new(START_BALANCE)),
            (carol.clone(), Amount::new(START_BALANCE)),
            (treasury.reserve_account().clone(), Amount::new(reserve_balance)),
        ]);
        let initial_supply = ledger.total_supply();
        let clock = ManualClock::at_epoch_secs(GENESIS_TIME).unwrap();
        let oracle = OracleSigner::new(acct("oracle"), Ed25519KeyPair::from_seed(&[42u8; 32]));
        let engine = DisputeEngine::new(
            config,
            oracle.identity(),
            ledger,
            InMemoryAssetRegistry::new(),
            treasury,
            InMemoryDisputeStore::new(),
            clock.clone(),
        )?;
        Ok(Self {
            engine,
            clock,
            oracle,
            nonce: 0,
            alice,
            bob,
            carol,
            initial_supply,
        })
    }

    pub fn caller(account: &AccountId) -> Caller {
        Caller::authenticated(account.clone())
    }

    pub fn open(&mut self, initiator: &AccountId, counterparty: &AccountId, stake: u64) -> DisputeId {
        self.try_open(initiator, counterparty, stake).unwrap()
    }

    pub fn try_open(
        &mut self,
        initiator: &AccountId,
        counterparty: &AccountId,
        stake: u64,
    ) -> Result<DisputeId, DisputeError> {
        self.engine.initiate(
            &Self::caller(initiator),
            InitiateRequest {
                counterparty: counterparty.clone(),
                stake: Amount::new(stake),
                evidence: evidence("initial"),
                fallback: fallback(),
            },
        )
    }

    /// Open alice vs bob and have bob match the stake.
    pub fn open_staked(&mut self, stake: u64) -> DisputeId {
        let (alice, bob) = (self.alice.clone(), self.bob.clone());
        let id = self.open(&alice, &bob, stake);
        self.engine
            .deposit_counterparty_stake(&Self::caller(&bob), id)
            .unwrap();
        id
    }

    pub fn propose(&mut self, id: DisputeId, text: &str) -> Result<(), DisputeError> {
        self.nonce += 1;
        let proposal = self.oracle.sign(id, self.nonce, text).unwrap();
        let oracle = Self::caller(self.oracle.account());
        self.engine.submit_proposal(&oracle, id, proposal)
    }

    pub fn accept(&mut self, who: &AccountId, id: DisputeId) -> Result<(), DisputeError> {
        self.engine.accept_proposal(&Self::caller(who), id)
    }

    pub fn advance(&self, secs: u64) {
        self.clock.advance(secs).unwrap();
    }

    pub fn now_secs(&self) -> i64 {
        self.clock.now().epoch_secs()
    }

    pub fn balance(&self, account: &AccountId) -> u64 {
        self.engine.ledger().balance(account).value()
    }

    pub fn escrow(&self) -> u64 {
        let escrow = self.engine.system_accounts().escrow.clone();
        self.balance(&escrow)
    }

    pub fn defense_fund(&self) -> u64 {
        let fund = self.engine.system_accounts().defense_fund.clone();
        self.balance(&fund)
    }

    pub fn burned(&self) -> u64 {
        let sink = self.engine.system_accounts().burn_sink.clone();
        self.balance(&sink)
    }

    pub fn reserve(&self) -> u64 {
        let reserve = self.engine.treasury().reserve_account().clone();
        self.balance(&reserve)
    }

    pub fn assert_supply_conserved(&self) {
        assert_eq!(
            self.engine.ledger().total_supply(),
            self.initial_supply,
            "total supply must never change"
        );
    }

    pub fn event_names(&self, id: DisputeId) -> Vec<&'static str> {
        self.engine
            .events()
            .for_dispute(id)
            .map(|r| r.event.name())
            .collect()
    }
}
