//! # Treasury
//!
//! The treasury owns the incentive reserve (the account that funds the
//! non-participation incentive and defense subsidies) and keeps the
//! per-account harassment score, the number of escalated filings an
//! initiator has made inside the cooldown window.

use std::collections::BTreeMap;

use thiserror::Error;
use truce_core::AccountId;

/// Errors from the treasury.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreasuryError {
    /// The treasury refused the update.
    #[error("treasury unavailable: {0}")]
    Unavailable(String),
}

/// Reserve ownership and harassment bookkeeping.
pub trait Treasury {
    /// The ledger account holding the incentive reserve.
    fn reserve_account(&self) -> &AccountId;

    /// Escalated filings recorded against `account`.
    fn harassment_score(&self, account: &AccountId) -> u32;

    /// Record one escalated filing; returns the new score.
    fn record_harassment(&mut self, account: &AccountId) -> Result<u32, TreasuryError>;

    /// Undo one [`Treasury::record_harassment`] from an aborted operation.
    fn revert_harassment(&mut self, account: &AccountId) -> Result<(), TreasuryError>;
}

/// In-process treasury.
#[derive(Debug, Clone)]
pub struct InMemoryTreasury {
    reserve: AccountId,
    scores: BTreeMap<AccountId, u32>,
    refuse_updates: bool,
}

impl Default for InMemoryTreasury {
    fn default() -> Self {
        Self::new(AccountId::system("incentive-reserve"))
    }
}

impl InMemoryTreasury {
    /// A treasury whose reserve lives in `reserve`.
    pub fn new(reserve: AccountId) -> Self {
        Self {
            reserve,
            scores: BTreeMap::new(),
            refuse_updates: false,
        }
    }

    /// Make score updates fail.
    pub fn refuse_updates(&mut self, refuse: bool) {
        self.refuse_updates = refuse;
    }
}

impl Treasury for InMemoryTreasury {
    fn reserve_account(&self) -> &AccountId {
        &self.reserve
    }

    fn harassment_score(&self, account: &AccountId) -> u32 {
        self.scores.get(account).copied().unwrap_or(0)
    }

    fn record_harassment(&mut self, account: &AccountId) -> Result<u32, TreasuryError> {
        if self.refuse_updates {
            return Err(TreasuryError::Unavailable("score update refused".to_string()));
        }
        let score = self.scores.entry(account.clone()).or_insert(0);
        *score = score.saturating_add(1);
        Ok(*score)
    }

    fn revert_harassment(&mut self, account: &AccountId) -> Result<(), TreasuryError> {
        if let Some(score) = self.scores.get_mut(account) {
            *score = score.saturating_sub(1);
            if *score == 0 {
                self.scores.remove(account);
            }
        }
        Ok(())
    }
}
