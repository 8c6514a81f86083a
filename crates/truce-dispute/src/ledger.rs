//! # Value Ledger
//!
//! The engine moves value only through the [`Ledger`] trait: a balance
//! query and an atomic transfer between two accounts. Stakes, payouts,
//! burns, fees and incentives are all transfers between party accounts
//! and the protocol's [`SystemAccounts`].
//!
//! ## Security Invariant
//!
//! A transfer either moves exactly `amount` from `from` to `to` or fails
//! with no effect. [`InMemoryLedger`] never mints after construction, so
//! [`InMemoryLedger::total_supply`] is invariant across every engine
//! operation, successful or rolled back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use truce_core::{AccountId, Amount};

/// Errors from ledger operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The source account cannot cover the transfer.
    #[error("{account} has {balance}, needs {requested}")]
    InsufficientFunds {
        /// Debited account.
        account: AccountId,
        /// Its balance.
        balance: Amount,
        /// Amount requested.
        requested: Amount,
    },

    /// Crediting the destination would overflow.
    #[error("balance overflow crediting {0}")]
    Overflow(AccountId),

    /// The ledger refused or could not process the transfer.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Atomic value movement.
pub trait Ledger {
    /// Current balance of `account`.
    fn balance(&self, account: &AccountId) -> Amount;

    /// Move `amount` from `from` to `to`, atomically.
    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<(), LedgerError>;
}

// ─── System accounts ─────────────────────────────────────────────────

/// Protocol-owned accounts the engine transfers through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemAccounts {
    /// Holds every live stake.
    pub escrow: AccountId,
    /// Receives burned value and split dust. Never debited.
    pub burn_sink: AccountId,
    /// Receives counter-fee over-payment when routing is enabled.
    pub fee_pool: AccountId,
    /// Holds incentive value set aside for specific disputes.
    pub incentive_earmark: AccountId,
    /// Holds defense subsidies until the counterparty stakes.
    pub defense_fund: AccountId,
}

impl Default for SystemAccounts {
    fn default() -> Self {
        Self {
            escrow: AccountId::system("escrow"),
            burn_sink: AccountId::system("burn"),
            fee_pool: AccountId::system("fee-pool"),
            incentive_earmark: AccountId::system("incentive-earmark"),
            defense_fund: AccountId::system("defense-fund"),
        }
    }
}

// ─── In-memory ledger ────────────────────────────────────────────────

/// A deterministic in-process ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balances: BTreeMap<AccountId, Amount>,
    refuse_credits_to: Option<AccountId>,
    transfers: u64,
}

impl InMemoryLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger seeded with initial balances.
    pub fn with_balances<I>(balances: I) -> Self
    where
        I: IntoIterator<Item = (AccountId, Amount)>,
    {
        let mut ledger = Self::new();
        for (account, amount) in balances {
            ledger.balances.insert(account, amount);
        }
        ledger
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> u128 {
        self.balances.values().map(|a| u128::from(a.value())).sum()
    }

    /// All non-zero balances.
    pub fn balances(&self) -> impl Iterator<Item = (&AccountId, &Amount)> {
        self.balances.iter().filter(|(_, amount)| !amount.is_zero())
    }

    /// Number of successful transfers.
    pub fn transfer_count(&self) -> u64 {
        self.transfers
    }

    /// Make every transfer crediting `account` fail until cleared.
    pub fn refuse_credits_to(&mut self, account: Option<AccountId>) {
        self.refuse_credits_to = account;
    }
}

impl Ledger for InMemoryLedger {
    fn balance(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(Amount::ZERO)
    }

    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        if self.refuse_credits_to.as_ref() == Some(to) {
            return Err(LedgerError::Unavailable(format!("credits to {to} refused")));
        }
        let balance = self.balance(from);
        let debited = balance
            .checked_sub(amount)
            .map_err(|_| LedgerError::InsufficientFunds {
                account: from.clone(),
                balance,
                requested: amount,
            })?;
        if from == to {
            self.transfers += 1;
            return Ok(());
        }
        let credited = self
            .balance(to)
            .checked_add(amount)
            .map_err(|_| LedgerError::Overflow(to.clone()))?;
        self.balances.insert(from.clone(), debited);
        self.balances.insert(to.clone(), credited);
        self.transfers += 1;
        Ok(())
    }
}
