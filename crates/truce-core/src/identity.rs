//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the identifiers used by the dispute engine. These
//! prevent accidental identifier confusion: a `DisputeId` cannot be passed
//! where an `AccountId` is expected.
//!
//! ## Security Invariant
//!
//! Account identifiers in the `system:` namespace (escrow, burn sink, fee
//! pool, incentive reserve) can only be built through
//! [`AccountId::system`]. [`AccountId::new`] rejects them, so no caller can
//! name a protocol account as a dispute party.

use serde::{Deserialize, Serialize};

use crate::error::TruceError;

const SYSTEM_PREFIX: &str = "system:";
const MAX_ACCOUNT_LEN: usize = 128;

/// Identity of an economic actor (or protocol account) on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Create a validated, non-system account identifier.
    ///
    /// # Errors
    ///
    /// Rejects empty identifiers, identifiers longer than 128 bytes,
    /// identifiers containing whitespace, and the reserved `system:` namespace.
    pub fn new(id: impl Into<String>) -> Result<Self, TruceError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TruceError::InvalidIdentifier(
                "account id must not be empty".to_string(),
            ));
        }
        if id.len() > MAX_ACCOUNT_LEN {
            return Err(TruceError::InvalidIdentifier(format!(
                "account id exceeds {MAX_ACCOUNT_LEN} bytes"
            )));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(TruceError::InvalidIdentifier(format!(
                "account id {id:?} contains whitespace"
            )));
        }
        if id.starts_with(SYSTEM_PREFIX) {
            return Err(TruceError::InvalidIdentifier(format!(
                "account id {id:?} uses the reserved system namespace"
            )));
        }
        Ok(Self(id))
    }

    /// Build a protocol-owned account in the `system:` namespace.
    pub fn system(name: &str) -> Self {
        Self(format!("{SYSTEM_PREFIX}{name}"))
    }

    /// Whether this is a protocol-owned account.
    pub fn is_system(&self) -> bool {
        self.0.starts_with(SYSTEM_PREFIX)
    }

    /// Borrow the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountId {
    type Error = TruceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.starts_with(SYSTEM_PREFIX) && value.len() > SYSTEM_PREFIX.len() {
            return Ok(Self(value));
        }
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monotonically assigned, never-reused dispute identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DisputeId(pub u64);

impl DisputeId {
    /// The first identifier ever assigned.
    pub const GENESIS: DisputeId = DisputeId(1);

    /// The identifier following this one.
    pub fn next(self) -> Result<Self, TruceError> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or(TruceError::ArithmeticOverflow("dispute id"))
    }

    /// Access the raw value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DisputeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dispute:{}", self.0)
    }
}
