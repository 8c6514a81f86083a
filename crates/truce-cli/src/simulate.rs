//! # Simulate Subcommand
//!
//! Runs a [`Scenario`] against a fresh in-memory engine with a manual clock
//! and a deterministic oracle key, then checks the scenario's expectations.
//!
//! Output: one JSON line per committed event, then a summary. Exit code 0
//! when every expectation holds, 1 otherwise.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use truce_core::{sha256_digest, AccountId, Amount, CanonicalBytes, ContentDigest, DisputeId, Timestamp};
use truce_crypto::Ed25519KeyPair;
use truce_dispute::{
    Caller, CounterRequest, DisputeEngine, EngineConfig, EventRecord, FallbackLicense,
    InMemoryAssetRegistry, InMemoryDisputeStore, InMemoryEngine, InMemoryLedger, InMemoryTreasury,
    InitiateRequest, Ledger, ManualClock, OracleSigner, Outcome, Treasury,
};

use crate::scenario::{Action, Scenario};

/// Seed of the simulation oracle key. Simulations are reproducible, never
/// secure.
const ORACLE_SEED: [u8; 32] = [0x7a; 32];

/// Account the simulation oracle signs as.
pub const ORACLE_ACCOUNT: &str = "oracle";

/// Fallback applied when an `initiate` step names none.
pub const STANDARD_FALLBACK_TERMS: &str = "terms://fallback/standard-v1";

const ONE_YEAR_SECS: u64 = 365 * 86_400;
const STANDARD_ROYALTY_CAP_BPS: u64 = 300;

/// Arguments for the simulate subcommand.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Path to the scenario YAML file.
    pub scenario: PathBuf,

    /// Print only the summary, not the event log.
    #[arg(long)]
    pub summary_only: bool,
}

/// Final state of a simulation and any expectation mismatches.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Scenario name.
    pub name: String,
    /// Steps executed before the run ended.
    pub steps_run: usize,
    /// Committed events in log order.
    pub events: Vec<EventRecord>,
    /// Final balance of every declared account.
    pub balances: BTreeMap<String, u64>,
    /// Outcome of every dispute.
    pub outcomes: BTreeMap<u64, Outcome>,
    /// Burn sink balance.
    pub burned: u64,
    /// Incentive reserve balance.
    pub reserve: u64,
    /// Escrow balance.
    pub escrow: u64,
    /// Human-readable mismatches; empty on success.
    pub failures: Vec<String>,
}

impl SimulationReport {
    /// Whether every step and expectation held.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Execute the simulate subcommand.
pub fn run_simulate(args: &SimulateArgs, config_path: Option<&Path>) -> Result<u8> {
    let scenario = Scenario::from_path(&args.scenario)?;
    let config = match config_path {
        Some(path) => Some(
            EngineConfig::from_path(path)
                .with_context(|| format!("failed to load engine config {}", path.display()))?,
        ),
        None => None,
    };

    let report = simulate(&scenario, config)?;

    if !args.summary_only {
        for record in &report.events {
            println!("{}", serde_json::to_string(record)?);
        }
    }
    for failure in &report.failures {
        println!("FAIL: {failure}");
    }
    let verdict = if report.passed() { "OK" } else { "FAILED" };
    println!(
        "{verdict}: scenario {} ran {} steps, {} events, {} burned",
        report.name,
        report.steps_run,
        report.events.len(),
        report.burned
    );
    Ok(if report.passed() { 0 } else { 1 })
}

/// Run a scenario. `config_override` replaces the scenario's own `config`.
pub fn simulate(scenario: &Scenario, config_override: Option<EngineConfig>) -> Result<SimulationReport> {
    let config = config_override
        .or_else(|| scenario.config.clone())
        .unwrap_or_default();
    let mut runner = Runner::new(scenario, config)?;
    let mut failures = Vec::new();
    let mut steps_run = 0;

    for (index, step) in scenario.steps.iter().enumerate() {
        let number = index + 1;
        let label = step.action.label();
        tracing::debug!(step = number, action = label, "scenario step");
        steps_run = number;

        match (runner.execute(&step.action), &step.expect_error) {
            (Ok(()), None) => {}
            (Ok(()), Some(expected)) => {
                failures.push(format!("step {number} ({label}): succeeded, expected error containing {expected:?}"));
            }
            (Err(err), Some(expected)) => {
                let message = format!("{err:#}");
                if !message.contains(expected.as_str()) {
                    failures.push(format!(
                        "step {number} ({label}): error {message:?} does not contain {expected:?}"
                    ));
                }
            }
            (Err(err), None) => {
                failures.push(format!("step {number} ({label}): {err:#}"));
                tracing::warn!(step = number, action = label, error = %err, "scenario aborted");
                break;
            }
        }
    }

    let mut report = runner.report(&scenario.name, steps_run, failures)?;
    check_expectations(scenario, &mut report);
    if runner.engine.ledger().total_supply() != runner.initial_supply {
        report.failures.push("total supply changed".to_string());
    }
    Ok(report)
}

fn check_expectations(scenario: &Scenario, report: &mut SimulationReport) {
    let expect = &scenario.expect;
    for (name, want) in &expect.balances {
        let got = report.balances.get(name).copied().unwrap_or(0);
        if got != *want {
            report
                .failures
                .push(format!("balance of {name}: expected {want}, got {got}"));
        }
    }
    for (id, want) in &expect.outcomes {
        match report.outcomes.get(id) {
            Some(got) if got == want => {}
            Some(got) => report
                .failures
                .push(format!("outcome of dispute #{id}: expected {want}, got {got}")),
            None => report
                .failures
                .push(format!("outcome of dispute #{id}: expected {want}, dispute does not exist")),
        }
    }
    let totals = [
        ("burned", expect.burned, report.burned),
        ("reserve", expect.reserve, report.reserve),
        ("escrow", expect.escrow, report.escrow),
    ];
    for (what, want, got) in totals {
        if let Some(want) = want {
            if want != got {
                report
                    .failures
                    .push(format!("{what}: expected {want}, got {got}"));
            }
        }
    }
}

// ─── Runner ──────────────────────────────────────────────────────────

struct Runner {
    engine: InMemoryEngine,
    clock: ManualClock,
    oracle: OracleSigner,
    nonce: u64,
    declared: Vec<String>,
    initial_supply: u128,
}

impl Runner {
    fn new(scenario: &Scenario, config: EngineConfig) -> Result<Self> {
        let start = Timestamp::parse(&scenario.start)
            .with_context(|| format!("invalid start instant {:?}", scenario.start))?;
        let clock = ManualClock::new(start);
        let treasury = InMemoryTreasury::default();

        let mut balances = Vec::with_capacity(scenario.accounts.len() + 1);
        for (name, balance) in &scenario.accounts {
            balances.push((account(name)?, Amount::new(*balance)));
        }
        balances.push((treasury.reserve_account().clone(), Amount::new(scenario.reserve)));
        let ledger = InMemoryLedger::with_balances(balances);
        let initial_supply = ledger.total_supply();

        let oracle = OracleSigner::new(account(ORACLE_ACCOUNT)?, Ed25519KeyPair::from_seed(&ORACLE_SEED));
        let engine = DisputeEngine::new(
            config,
            oracle.identity(),
            ledger,
            InMemoryAssetRegistry::new(),
            treasury,
            InMemoryDisputeStore::new(),
            clock.clone(),
        )
        .context("engine configuration rejected")?;

        Ok(Self {
            engine,
            clock,
            oracle,
            nonce: 0,
            declared: scenario.accounts.keys().cloned().collect(),
            initial_supply,
        })
    }

    fn execute(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Initiate {
                initiator,
                counterparty,
                stake,
                evidence,
                fallback,
            } => {
                let request = InitiateRequest {
                    counterparty: account(counterparty)?,
                    stake: Amount::new(*stake),
                    evidence: evidence_digest(evidence)?,
                    fallback: fallback.clone().unwrap_or_else(standard_fallback),
                };
                let id = self.engine.initiate(&caller(initiator)?, request)?;
                tracing::info!(dispute_id = %id, %initiator, "dispute opened");
            }
            Action::Deposit { caller: who, dispute } => {
                self.engine
                    .deposit_counterparty_stake(&caller(who)?, DisputeId(*dispute))?;
            }
            Action::Propose { dispute, text, nonce } => {
                let nonce = match nonce {
                    Some(n) => *n,
                    None => self.nonce + 1,
                };
                self.nonce = self.nonce.max(nonce);
                let id = DisputeId(*dispute);
                let proposal = self.oracle.sign(id, nonce, text)?;
                let oracle = Caller::authenticated(self.oracle.account().clone());
                self.engine.submit_proposal(&oracle, id, proposal)?;
            }
            Action::Accept { caller: who, dispute } => {
                self.engine
                    .accept_proposal(&caller(who)?, DisputeId(*dispute))?;
            }
            Action::Counter {
                caller: who,
                dispute,
                max_fee,
                evidence,
            } => {
                let request = CounterRequest {
                    evidence: evidence_digest(evidence)?,
                    max_fee: Amount::new(*max_fee),
                };
                self.engine
                    .counter_propose(&caller(who)?, DisputeId(*dispute), request)?;
            }
            Action::Subsidy { caller: who, dispute } => {
                let granted = self
                    .engine
                    .request_defense_subsidy(&caller(who)?, DisputeId(*dispute))?;
                tracing::info!(dispute = *dispute, %granted, "defense subsidy granted");
            }
            Action::Enforce { caller: who, dispute } => {
                let outcome = self
                    .engine
                    .enforce_timeout(&caller(who)?, DisputeId(*dispute))?;
                tracing::info!(dispute = *dispute, %outcome, "timeout enforced");
            }
            Action::RetryRelease { caller: who, dispute } => {
                self.engine.retry_release(&caller(who)?, DisputeId(*dispute))?;
            }
            Action::Advance { .. } => {
                let secs = action
                    .advance_secs()
                    .context("advance duration overflows")?;
                let now = self.clock.advance(secs)?;
                tracing::debug!(now = %now, "clock advanced");
            }
        }
        Ok(())
    }

    fn report(&self, name: &str, steps_run: usize, failures: Vec<String>) -> Result<SimulationReport> {
        let ledger = self.engine.ledger();
        let accounts = self.engine.system_accounts();

        let mut balances = BTreeMap::new();
        for name in &self.declared {
            balances.insert(name.clone(), ledger.balance(&account(name)?).value());
        }
        let outcomes = self
            .engine
            .store()
            .records()
            .map(|d| (d.id.value(), d.outcome))
            .collect();

        Ok(SimulationReport {
            name: name.to_string(),
            steps_run,
            events: self.engine.events().records().to_vec(),
            balances,
            outcomes,
            burned: ledger.balance(&accounts.burn_sink).value(),
            reserve: ledger.balance(self.engine.treasury().reserve_account()).value(),
            escrow: ledger.balance(&accounts.escrow).value(),
            failures,
        })
    }
}

fn account(name: &str) -> Result<AccountId> {
    AccountId::new(name).with_context(|| format!("invalid account name {name:?}"))
}

fn caller(name: &str) -> Result<Caller> {
    Ok(Caller::authenticated(account(name)?))
}

fn evidence_digest(tag: &str) -> Result<ContentDigest> {
    let bytes = CanonicalBytes::new(&serde_json::json!({ "evidence": tag }))?;
    Ok(sha256_digest(&bytes))
}

fn standard_fallback() -> FallbackLicense {
    FallbackLicense::non_exclusive(STANDARD_FALLBACK_TERMS, ONE_YEAR_SECS, STANDARD_ROYALTY_CAP_BPS)
}
