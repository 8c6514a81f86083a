//! # Resolution Policy
//!
//! Pure, deterministic arithmetic for every value-moving decision the
//! engine makes. Nothing here touches a ledger, clock or store; the
//! engine gathers inputs, calls these functions, and executes the
//! resulting [`Settlement`].
//!
//! ## Security Invariant
//!
//! Every split is integer-only, floors each division, and assigns the
//! floored remainder ("dust") explicitly to the burn sink, so a
//! settlement always satisfies
//!
//! ```text
//! to_initiator + to_counterparty + burned + dust == initiator_stake + counterparty_stake
//! ```
//!
//! All intermediates are checked; overflow is an error, never a wrap.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use truce_core::{Amount, Timestamp, TruceError, BPS_DENOMINATOR};

/// Errors from policy evaluation.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// Checked arithmetic failed.
    #[error(transparent)]
    Arithmetic(#[from] TruceError),

    /// The requested counter round is past the configured cap.
    #[error("counter round {round} exceeds the cap of {max}")]
    CounterLimit {
        /// Zero-based round requested.
        round: u32,
        /// Configured cap.
        max: u32,
    },
}

// ─── Settlement ──────────────────────────────────────────────────────

/// How escrowed stake leaves escrow at resolution, plus any reserve-funded
/// incentive paid alongside it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Escrow returned to the initiator.
    pub to_initiator: Amount,
    /// Escrow returned to the counterparty.
    pub to_counterparty: Amount,
    /// Escrow burned by policy.
    pub burned: Amount,
    /// Floored remainder of the split, also sent to the burn sink.
    pub dust: Amount,
    /// Reserve-funded incentive paid to the initiator. Not escrow.
    pub incentive: Amount,
}

impl Settlement {
    /// Total value this settlement moves out of escrow.
    pub fn escrow_outflow(&self) -> Result<Amount, TruceError> {
        self.to_initiator
            .checked_add(self.to_counterparty)?
            .checked_add(self.burned)?
            .checked_add(self.dust)
    }

    /// Whether the settlement exactly drains `total_stake` from escrow.
    pub fn conserves(&self, total_stake: Amount) -> bool {
        self.escrow_outflow()
            .map(|out| out == total_stake)
            .unwrap_or(false)
    }

    /// Everything sent to the burn sink.
    pub fn total_burned(&self) -> Result<Amount, TruceError> {
        self.burned.checked_add(self.dust)
    }
}

// ─── Escalation ──────────────────────────────────────────────────────

/// Required initiator stake after applying the cooldown rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escalation {
    /// Stake actually debited.
    pub stake: Amount,
    /// Whether the multiplier was applied.
    pub escalated: bool,
}

/// Whether `now` falls inside the cooldown window opened at `last`.
///
/// The window is half-open: `now == last + cooldown_secs` is outside.
pub fn in_cooldown(last: Option<Timestamp>, now: Timestamp, cooldown_secs: u64) -> bool {
    match last {
        Some(last) => now.secs_since(&last) < cooldown_secs,
        None => false,
    }
}

/// Apply the escalation multiplier when the pair last disputed inside the
/// cooldown window. The escalated stake is floored.
pub fn escalated_stake(
    base: Amount,
    last: Option<Timestamp>,
    now: Timestamp,
    cooldown_secs: u64,
    multiplier_bps: u64,
) -> Result<Escalation, TruceError> {
    if in_cooldown(last, now, cooldown_secs) {
        Ok(Escalation {
            stake: base.mul_bps(multiplier_bps)?,
            escalated: true,
        })
    } else {
        Ok(Escalation {
            stake: base,
            escalated: false,
        })
    }
}

// ─── Counter rounds ──────────────────────────────────────────────────

/// Fee for zero-based counter round `round`: `base_fee * 2^round`.
pub fn counter_fee(base_fee: Amount, round: u32, max_counters: u32) -> Result<Amount, PolicyError> {
    if round >= max_counters {
        return Err(PolicyError::CounterLimit {
            round,
            max: max_counters,
        });
    }
    let factor = 1u64
        .checked_shl(round)
        .ok_or(TruceError::ArithmeticOverflow("counter fee exponent"))?;
    Ok(base_fee.checked_mul(factor)?)
}

/// Deadline extension for the next round, clamped so the cumulative
/// extension never exceeds `cap_secs`.
pub fn counter_extension(per_round_secs: u64, cumulative_secs: u64, cap_secs: u64) -> u64 {
    per_round_secs.min(cap_secs.saturating_sub(cumulative_secs))
}

// ─── Splits ──────────────────────────────────────────────────────────

/// Deadlock timeout: burn `burn_bps` of the combined stake, split the rest
/// evenly, and send the odd unit (plus any burn rounding) to the sink.
pub fn timeout_split(
    initiator_stake: Amount,
    counterparty_stake: Amount,
    burn_bps: u64,
) -> Result<Settlement, TruceError> {
    if burn_bps > BPS_DENOMINATOR {
        return Err(TruceError::ArithmeticOverflow("burn ratio above 100%"));
    }
    let total = initiator_stake.checked_add(counterparty_stake)?;
    let burned = total.mul_bps(burn_bps)?;
    let remaining = total.checked_sub(burned)?;
    let (share, dust) = remaining.split_even(2)?;
    Ok(Settlement {
        to_initiator: share,
        to_counterparty: share,
        burned,
        dust,
        incentive: Amount::ZERO,
    })
}

/// Mutual acceptance: both stakes are returned in full.
pub fn accepted_split(initiator_stake: Amount, counterparty_stake: Amount) -> Settlement {
    Settlement {
        to_initiator: initiator_stake,
        to_counterparty: counterparty_stake,
        ..Settlement::default()
    }
}

/// Non-participation: the initiator recovers its stake plus whatever
/// incentive the reserve actually covered.
pub fn default_license_split(initiator_stake: Amount, incentive: Amount) -> Settlement {
    Settlement {
        to_initiator: initiator_stake,
        incentive,
        ..Settlement::default()
    }
}

// ─── Incentive & subsidy ─────────────────────────────────────────────

/// Incentive owed on a default-license resolution.
pub fn incentive_amount(initiator_stake: Amount, incentive_bps: u64) -> Result<Amount, TruceError> {
    initiator_stake.mul_bps(incentive_bps)
}

/// The incentive is paid in full or not at all.
pub fn incentive_draw(owed: Amount, available: Amount) -> Amount {
    if available >= owed {
        owed
    } else {
        Amount::ZERO
    }
}

/// Defense subsidy offered to a counterparty facing an initiator with
/// `harassment_score` prior escalated filings:
/// `stake * min(base_bps * (1 + score), max_bps) / 10_000`.
pub fn subsidy_amount(
    initiator_stake: Amount,
    harassment_score: u32,
    base_bps: u64,
    max_bps: u64,
) -> Result<Amount, TruceError> {
    let bps = base_bps
        .checked_mul(u64::from(harassment_score) + 1)
        .map_or(max_bps, |bps| bps.min(max_bps));
    initiator_stake.mul_bps(bps)
}
