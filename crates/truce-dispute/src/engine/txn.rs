//! Per-operation journal of applied effects and buffered events.
//!
//! Every external effect an operation applies is recorded together with
//! its compensation. On failure the engine replays the compensations in
//! reverse; on success it drops them and publishes the buffered events.

use truce_core::{AccountId, Amount, DisputeId, Timestamp};

use crate::dispute::Dispute;
use crate::events::DisputeEvent;

/// Compensation for one applied effect.
#[derive(Debug)]
pub(crate) enum Undo {
    /// Reverse with a transfer `to -> from`.
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
    /// Release a freeze applied in this operation.
    Freeze { dispute_id: DisputeId },
    /// Re-freeze an asset released in this operation.
    Unfreeze {
        dispute_id: DisputeId,
        holder: AccountId,
    },
    /// Decrement a harassment score bumped in this operation.
    Harassment { account: AccountId },
    /// Put back the record as it was before this operation.
    Restore { previous: Box<Dispute> },
}

/// Effects and events of one in-flight operation.
#[derive(Debug)]
pub(crate) struct Transaction {
    op: &'static str,
    now: Timestamp,
    undo: Vec<Undo>,
    events: Vec<(DisputeId, DisputeEvent)>,
}

impl Transaction {
    pub(crate) fn begin(op: &'static str, now: Timestamp) -> Self {
        Self {
            op,
            now,
            undo: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Operation name.
    pub(crate) fn op(&self) -> &'static str {
        self.op
    }

    /// The single instant this operation observes.
    pub(crate) fn now(&self) -> Timestamp {
        self.now
    }

    pub(crate) fn record(&mut self, undo: Undo) {
        self.undo.push(undo);
    }

    pub(crate) fn emit(&mut self, dispute_id: DisputeId, event: DisputeEvent) {
        self.events.push((dispute_id, event));
    }

    /// Compensations, most recent first.
    pub(crate) fn into_compensations(self) -> impl Iterator<Item = Undo> {
        self.undo.into_iter().rev()
    }

    pub(crate) fn into_events(self) -> Vec<(DisputeId, DisputeEvent)> {
        self.events
    }
}
