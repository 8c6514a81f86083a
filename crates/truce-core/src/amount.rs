//! # Amount: Checked Value Arithmetic
//!
//! Every stake, fee, burn, payout and incentive in the engine is an
//! [`Amount`]. The type exposes only checked operations, so a fixed-width
//! wraparound cannot silently create or destroy value.
//!
//! ## Rounding
//!
//! [`Amount::mul_bps`] multiplies through a `u128` intermediate and floors.
//! Callers that split value account for the floored remainder explicitly
//! (see the resolution policy); nothing here drops it on their behalf.

use serde::{Deserialize, Serialize};

use crate::error::TruceError;

/// Basis-point denominator: 10 000 bps = 100%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// A non-negative quantity of the ledger's unit of account.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Zero.
    pub const ZERO: Amount = Amount(0);

    /// Wrap a raw value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw value.
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Whether this amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Result<Amount, TruceError> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or(TruceError::ArithmeticOverflow("amount addition"))
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Amount) -> Result<Amount, TruceError> {
        self.0
            .checked_sub(other.0)
            .map(Amount)
            .ok_or(TruceError::ArithmeticOverflow("amount subtraction"))
    }

    /// Checked multiplication by an integer factor.
    pub fn checked_mul(self, factor: u64) -> Result<Amount, TruceError> {
        self.0
            .checked_mul(factor)
            .map(Amount)
            .ok_or(TruceError::ArithmeticOverflow("amount multiplication"))
    }

    /// `self * bps / 10_000`, floored.
    ///
    /// `bps` may exceed 10 000 (multipliers above 100%); the result must
    /// still fit in a `u64`.
    pub fn mul_bps(self, bps: u64) -> Result<Amount, TruceError> {
        let scaled = u128::from(self.0) * u128::from(bps) / u128::from(BPS_DENOMINATOR);
        u64::try_from(scaled)
            .map(Amount)
            .map_err(|_| TruceError::ArithmeticOverflow("basis-point scaling"))
    }

    /// Split into `parts` equal shares, returning `(share, remainder)`.
    ///
    /// `share * parts + remainder == self` always holds.
    pub fn split_even(self, parts: u64) -> Result<(Amount, Amount), TruceError> {
        if parts == 0 {
            return Err(TruceError::ArithmeticOverflow("split into zero parts"));
        }
        Ok((Amount(self.0 / parts), Amount(self.0 % parts)))
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
