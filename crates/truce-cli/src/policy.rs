//! # Policy Subcommand
//!
//! Evaluates the engine's resolution arithmetic without running a dispute.
//! Every command prints a JSON object on stdout.
//!
//! ```bash
//! truce policy timeout-split --stake 1000
//! truce policy counter-fee --round 2
//! truce policy escalate --stake 100 --recent
//! truce policy subsidy --stake 150 --score 1
//! ```

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::{json, Value};
use truce_core::{Amount, Timestamp};
use truce_dispute::{policy, EngineConfig};

/// Arguments for the policy subcommand.
#[derive(Args, Debug)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommand,
}

/// Policy computations.
#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
    /// Deadlock settlement for the given stakes.
    TimeoutSplit {
        /// Initiator stake.
        #[arg(long)]
        stake: u64,
        /// Counterparty stake; defaults to the initiator stake.
        #[arg(long)]
        counterparty_stake: Option<u64>,
    },
    /// Fee for a zero-based counter round.
    CounterFee {
        /// Round number, starting at 0.
        #[arg(long)]
        round: u32,
    },
    /// Stake required for a filing, with or without a recent prior filing.
    Escalate {
        /// Base stake offered.
        #[arg(long)]
        stake: u64,
        /// The same pair disputed inside the cooldown window.
        #[arg(long)]
        recent: bool,
    },
    /// Defense subsidy for a counterparty.
    Subsidy {
        /// Initiator stake.
        #[arg(long)]
        stake: u64,
        /// Initiator harassment score.
        #[arg(long, default_value_t = 0)]
        score: u32,
    },
}

/// Execute the policy subcommand.
pub fn run_policy(args: &PolicyArgs, config: &EngineConfig) -> Result<u8> {
    let value = evaluate(&args.command, config)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(0)
}

/// Compute the JSON result of a policy command.
pub fn evaluate(command: &PolicyCommand, config: &EngineConfig) -> Result<Value> {
    match command {
        PolicyCommand::TimeoutSplit {
            stake,
            counterparty_stake,
        } => {
            let initiator = Amount::new(*stake);
            let counterparty = Amount::new(counterparty_stake.unwrap_or(*stake));
            let settlement = policy::timeout_split(initiator, counterparty, config.timeout_burn_bps)
                .context("timeout split overflowed")?;
            Ok(json!({
                "burn_bps": config.timeout_burn_bps,
                "settlement": settlement,
            }))
        }
        PolicyCommand::CounterFee { round } => {
            let fee = policy::counter_fee(config.counter_base_fee, *round, config.max_counters)?;
            let extension = (0..=*round).fold(0u64, |cumulative, _| {
                cumulative
                    + policy::counter_extension(
                        config.counter_extension_secs,
                        cumulative,
                        config.max_total_extension_secs,
                    )
            });
            Ok(json!({
                "round": round,
                "fee": fee,
                "cumulative_extension_secs": extension,
            }))
        }
        PolicyCommand::Escalate { stake, recent } => {
            // A synthetic prior filing one second ago stands in for "recent".
            let now = Timestamp::from_epoch_secs(config.cooldown_secs as i64 + 1)?;
            let last = if *recent {
                Some(Timestamp::from_epoch_secs(config.cooldown_secs as i64)?)
            } else {
                None
            };
            let escalation = policy::escalated_stake(
                Amount::new(*stake),
                last,
                now,
                config.cooldown_secs,
                config.escalation_multiplier_bps,
            )?;
            Ok(json!({
                "base_stake": stake,
                "stake": escalation.stake,
                "escalated": escalation.escalated,
                "multiplier_bps": config.escalation_multiplier_bps,
            }))
        }
        PolicyCommand::Subsidy { stake, score } => {
            let amount = policy::subsidy_amount(
                Amount::new(*stake),
                *score,
                config.subsidy_base_bps,
                config.subsidy_max_bps,
            )?;
            Ok(json!({
                "initiator_stake": stake,
                "harassment_score": score,
                "subsidy": amount,
            }))
        }
    }
}
