//! # Dispute Store
//!
//! Persistent state behind the engine: dispute records keyed by
//! [`DisputeId`], the id counter, the last-dispute timestamp for each
//! (initiator, counterparty) pair, and the last accepted oracle nonce.
//!
//! Each engine operation ends in at most one [`DisputeStore::write`],
//! which applies a [`StoreWrite`] atomically: the record and any
//! cooldown or nonce update land together or not at all.

use std::collections::BTreeMap;

use thiserror::Error;
use truce_core::{AccountId, DisputeId, Timestamp, TruceError};

use crate::dispute::Dispute;

/// Errors from the dispute store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A new record did not carry the next id.
    #[error("expected new record {expected}, got {got}")]
    UnexpectedId {
        /// The id the store would assign.
        expected: DisputeId,
        /// The id written.
        got: DisputeId,
    },

    /// The id counter is exhausted.
    #[error(transparent)]
    Exhausted(#[from] TruceError),

    /// The backend refused the write.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The last dispute opened between an ordered pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownTouch {
    /// Filed the dispute.
    pub initiator: AccountId,
    /// Filed against.
    pub counterparty: AccountId,
    /// When.
    pub at: Timestamp,
}

/// One atomic store update.
#[derive(Debug, Clone)]
pub struct StoreWrite {
    /// Record to insert (if new) or replace.
    pub dispute: Dispute,
    /// Cooldown pair to stamp.
    pub cooldown: Option<CooldownTouch>,
    /// New last-accepted oracle nonce.
    pub oracle_nonce: Option<u64>,
}

impl StoreWrite {
    /// A write carrying only the record.
    pub fn record(dispute: Dispute) -> Self {
        Self {
            dispute,
            cooldown: None,
            oracle_nonce: None,
        }
    }
}

/// Dispute persistence.
pub trait DisputeStore {
    /// The id the next new record must carry.
    fn next_id(&self) -> DisputeId;

    /// Load a record.
    fn get(&self, id: DisputeId) -> Result<Option<Dispute>, StoreError>;

    /// Number of records ever created.
    fn count(&self) -> u64;

    /// When `initiator` last opened a dispute against `counterparty`.
    fn last_dispute_between(&self, initiator: &AccountId, counterparty: &AccountId) -> Option<Timestamp>;

    /// Highest oracle nonce accepted so far.
    fn last_oracle_nonce(&self) -> Option<u64>;

    /// Apply `write` atomically. A record with [`DisputeStore::next_id`]
    /// is inserted and advances the counter; an existing record is
    /// replaced. Records are never deleted.
    fn write(&mut self, write: StoreWrite) -> Result<(), StoreError>;
}

// ─── In-memory store ─────────────────────────────────────────────────

/// In-process store backed by ordered maps.
#[derive(Debug, Clone)]
pub struct InMemoryDisputeStore {
    records: BTreeMap<DisputeId, Dispute>,
    next_id: DisputeId,
    cooldowns: BTreeMap<(AccountId, AccountId), Timestamp>,
    oracle_nonce: Option<u64>,
    refuse_writes: bool,
}

impl Default for InMemoryDisputeStore {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            next_id: DisputeId::GENESIS,
            cooldowns: BTreeMap::new(),
            oracle_nonce: None,
            refuse_writes: false,
        }
    }
}

impl InMemoryDisputeStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make writes fail.
    pub fn refuse_writes(&mut self, refuse: bool) {
        self.refuse_writes = refuse;
    }

    /// All records in id order.
    pub fn records(&self) -> impl Iterator<Item = &Dispute> {
        self.records.values()
    }
}

impl DisputeStore for InMemoryDisputeStore {
    fn next_id(&self) -> DisputeId {
        self.next_id
    }

    fn get(&self, id: DisputeId) -> Result<Option<Dispute>, StoreError> {
        Ok(self.records.get(&id).cloned())
    }

    fn count(&self) -> u64 {
        self.next_id.value() - DisputeId::GENESIS.value()
    }

    fn last_dispute_between(&self, initiator: &AccountId, counterparty: &AccountId) -> Option<Timestamp> {
        self.cooldowns
            .get(&(initiator.clone(), counterparty.clone()))
            .copied()
    }

    fn last_oracle_nonce(&self) -> Option<u64> {
        self.oracle_nonce
    }

    fn write(&mut self, write: StoreWrite) -> Result<(), StoreError> {
        if self.refuse_writes {
            return Err(StoreError::Unavailable("writes refused".to_string()));
        }
        let id = write.dispute.id;
        let advance = if self.records.contains_key(&id) {
            None
        } else if id == self.next_id {
            Some(id.next()?)
        } else {
            return Err(StoreError::UnexpectedId {
                expected: self.next_id,
                got: id,
            });
        };

        self.records.insert(id, write.dispute);
        if let Some(next) = advance {
            self.next_id = next;
        }
        if let Some(touch) = write.cooldown {
            self.cooldowns
                .insert((touch.initiator, touch.counterparty), touch.at);
        }
        if let Some(nonce) = write.oracle_nonce {
            self.oracle_nonce = Some(nonce);
        }
        Ok(())
    }
}
