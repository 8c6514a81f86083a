//! # Temporal Types: UTC-Only Timestamps
//!
//! Defines `Timestamp`, the clock reading used for dispute start times,
//! stake windows, resolution deadlines and cooldown records.
//!
//! ## Invariants
//!
//! - Always UTC, truncated to whole seconds.
//! - Deadline arithmetic ([`Timestamp::checked_add_secs`]) is checked; a
//!   deadline that would overflow the calendar is an error, never a wrap.
//! - Strict parsing accepts only the `Z` suffix.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TruceError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 string. Only the `Z` suffix is accepted.
    pub fn parse(s: &str) -> Result<Self, TruceError> {
        if !s.ends_with('Z') {
            return Err(TruceError::InvalidTimestamp(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| TruceError::InvalidTimestamp(format!("{s:?}: {e}")))?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// From a Unix epoch timestamp in seconds.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, TruceError> {
        let dt = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| TruceError::InvalidTimestamp(format!("unix timestamp {secs}")))?;
        Ok(Self(dt))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// This timestamp moved forward by `secs` seconds.
    ///
    /// # Errors
    ///
    /// Returns [`TruceError::ArithmeticOverflow`] when the result is not
    /// representable.
    pub fn checked_add_secs(&self, secs: u64) -> Result<Self, TruceError> {
        let secs = i64::try_from(secs).map_err(|_| TruceError::ArithmeticOverflow("timestamp"))?;
        let delta =
            Duration::try_seconds(secs).ok_or(TruceError::ArithmeticOverflow("timestamp"))?;
        self.0
            .checked_add_signed(delta)
            .map(Self)
            .ok_or(TruceError::ArithmeticOverflow("timestamp"))
    }

    /// Whole seconds elapsed from `earlier` to `self`, saturating at zero.
    pub fn secs_since(&self, earlier: &Timestamp) -> u64 {
        u64::try_from(self.epoch_secs().saturating_sub(earlier.epoch_secs())).unwrap_or(0)
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
