//! # Engine Configuration
//!
//! Every tunable of the dispute protocol lives in [`EngineConfig`]: the
//! stake and resolution windows, the cooldown and escalation multiplier,
//! counter-round economics, the timeout burn ratio, the non-participation
//! incentive, and the two operational policies (incentive reserve and
//! asset-release failure handling).
//!
//! Configuration is loaded from YAML with serde defaults for every field,
//! then checked by [`EngineConfig::validate`] before an engine accepts it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use truce_core::{Amount, BPS_DENOMINATOR};

const DAY_SECS: u64 = 24 * 60 * 60;

/// Upper bound on configured counter rounds. The counter fee doubles per
/// round, so 2^32 is the largest multiplier the engine will ever apply.
pub const MAX_COUNTER_ROUNDS: u32 = 32;

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The YAML document did not match the schema.
    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A field is outside its permitted range.
    #[error("invalid config field `{field}`: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

// ─── Policies ────────────────────────────────────────────────────────

/// How the non-participation incentive is funded from the reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservePolicy {
    /// The incentive is drawn from the shared reserve at resolution time.
    /// Concurrent disputes compete and the reserve may be empty by then.
    #[default]
    SharedFirstCome,
    /// The incentive is set aside from the reserve at initiation and
    /// returned to the reserve if the dispute resolves any other way.
    Earmarked,
}

/// What happens when the asset registry rejects the release at resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnfreezePolicy {
    /// Release failure aborts the whole resolution and rolls it back.
    #[default]
    Strict,
    /// Resolution proceeds; the release is parked and retried later
    /// through `retry_release`.
    BestEffort,
}

// ─── Config ──────────────────────────────────────────────────────────

/// Protocol parameters for a dispute engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Seconds the counterparty has to post the defensive stake.
    pub stake_window_secs: u64,
    /// Seconds from the (rebased) start time until the dispute can be
    /// force-resolved.
    pub resolution_timeout_secs: u64,
    /// Re-filing against the same counterparty within this window is
    /// escalated.
    pub cooldown_secs: u64,
    /// Stake multiplier for escalated filings, in bps (15000 = 1.5x).
    pub escalation_multiplier_bps: u64,
    /// Maximum number of counter-proposal rounds per dispute.
    pub max_counters: u32,
    /// Fee for the first counter round; doubles every round.
    pub counter_base_fee: Amount,
    /// Deadline extension granted per counter round.
    pub counter_extension_secs: u64,
    /// Cap on the total deadline extension across all rounds.
    pub max_total_extension_secs: u64,
    /// Share of the combined stake burned on a deadlock timeout, in bps.
    pub timeout_burn_bps: u64,
    /// Non-participation incentive as a share of the initiator stake, in bps.
    pub incentive_bps: u64,
    /// Route fee over-payment to the fee pool instead of leaving it with
    /// the caller.
    pub route_excess_fee_to_pool: bool,
    /// Incentive reserve policy.
    pub reserve_policy: ReservePolicy,
    /// Asset-release failure policy.
    pub unfreeze_policy: UnfreezePolicy,
    /// Defense subsidy base rate, in bps of the initiator stake.
    pub subsidy_base_bps: u64,
    /// Defense subsidy ceiling, in bps of the initiator stake.
    pub subsidy_max_bps: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stake_window_secs: 7 * DAY_SECS,
            resolution_timeout_secs: 14 * DAY_SECS,
            cooldown_secs: 30 * DAY_SECS,
            escalation_multiplier_bps: 15_000,
            max_counters: 3,
            counter_base_fee: Amount::new(10),
            counter_extension_secs: 2 * DAY_SECS,
            max_total_extension_secs: 3 * DAY_SECS,
            timeout_burn_bps: 5_000,
            incentive_bps: 1_000,
            route_excess_fee_to_pool: false,
            reserve_policy: ReservePolicy::SharedFirstCome,
            unfreeze_policy: UnfreezePolicy::Strict,
            subsidy_base_bps: 500,
            subsidy_max_bps: 5_000,
        }
    }
}

impl EngineConfig {
    /// Parse a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Check every field against its permitted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_zero("stake_window_secs", self.stake_window_secs)?;
        non_zero("resolution_timeout_secs", self.resolution_timeout_secs)?;
        if self.resolution_timeout_secs <= self.stake_window_secs {
            return Err(invalid(
                "resolution_timeout_secs",
                format!(
                    "must exceed stake_window_secs ({}), got {}",
                    self.stake_window_secs, self.resolution_timeout_secs
                ),
            ));
        }
        if self.escalation_multiplier_bps < BPS_DENOMINATOR {
            return Err(invalid(
                "escalation_multiplier_bps",
                format!(
                    "must be at least {BPS_DENOMINATOR} (1x), got {}",
                    self.escalation_multiplier_bps
                ),
            ));
        }
        if self.max_counters > MAX_COUNTER_ROUNDS {
            return Err(invalid(
                "max_counters",
                format!("must be at most {MAX_COUNTER_ROUNDS}, got {}", self.max_counters),
            ));
        }
        if self.counter_extension_secs > self.max_total_extension_secs {
            return Err(invalid(
                "counter_extension_secs",
                format!(
                    "per-round extension {} exceeds the total cap {}",
                    self.counter_extension_secs, self.max_total_extension_secs
                ),
            ));
        }
        at_most_full("timeout_burn_bps", self.timeout_burn_bps)?;
        at_most_full("incentive_bps", self.incentive_bps)?;
        at_most_full("subsidy_base_bps", self.subsidy_base_bps)?;
        at_most_full("subsidy_max_bps", self.subsidy_max_bps)?;
        if self.subsidy_base_bps > self.subsidy_max_bps {
            return Err(invalid(
                "subsidy_base_bps",
                "must not exceed subsidy_max_bps".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

fn non_zero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(field, "must be greater than zero".to_string()));
    }
    Ok(())
}

fn at_most_full(field: &'static str, bps: u64) -> Result<(), ConfigError> {
    if bps > BPS_DENOMINATOR {
        return Err(invalid(
            field,
            format!("{bps} bps exceeds {BPS_DENOMINATOR}"),
        ));
    }
    Ok(())
}
