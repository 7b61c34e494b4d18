//! Folds settlement-ledger events into milestone records.
//!
//! Per milestone: `absent → created → (funded)? → (released | canceled)`.
//!
//! Events are applied in ledger order. A Created event inserts a record; later
//! events for that id flip their flag, append to history and advance
//! `last_event_block`. Events for ids never created inside the fetched window
//! are not ours and are dropped.

use std::collections::{BTreeMap, HashSet};

use crate::reference;
use crate::types::{DecodedLog, EventKind, LedgerEvent, Milestone, MilestoneEvent, MilestoneId};

/// Counters describing what the fold did with its input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    /// Milestone records created.
    pub created: usize,
    /// Events applied to an existing record.
    pub applied: usize,
    /// Repeated deliveries (same milestone, kind and tx hash) or repeated Created.
    pub duplicates: usize,
    /// Events for ids with no Created event in the batch.
    pub orphaned: usize,
    /// Events that tried to flip a different flag after a terminal state.
    pub terminal_conflicts: usize,
}

/// Accumulates milestone records for the duration of one query.
#[derive(Debug, Default)]
pub struct MilestoneAggregator {
    milestones: BTreeMap<MilestoneId, Milestone>,
    seen: HashSet<String>,
    stats: AggregateStats,
}

impl MilestoneAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a whole batch in order.
    pub fn extend<'a>(&mut self, logs: impl IntoIterator<Item = &'a DecodedLog>) {
        for log in logs {
            self.apply(log);
        }
    }

    /// Apply one decoded log. Non-settlement events are ignored.
    pub fn apply(&mut self, log: &DecodedLog) {
        let Some((id, kind)) = log.event.milestone_kind() else {
            return;
        };
        let event_id = MilestoneEvent::event_id(id, kind, &log.meta.tx_hash);

        if kind == EventKind::Created {
            self.create(log, event_id);
            return;
        }

        let Some(milestone) = self.milestones.get_mut(&id) else {
            self.stats.orphaned += 1;
            tracing::trace!(id, %kind, tx = %log.meta.tx_hash, "dropping event for unknown milestone");
            return;
        };

        if !self.seen.insert(event_id.clone()) {
            self.stats.duplicates += 1;
            return;
        }

        let mut entry = MilestoneEvent {
            id: event_id,
            milestone_id: id,
            kind,
            block_number: log.meta.block_number,
            transaction_hash: log.meta.tx_hash.clone(),
            actor: None,
            amount: None,
            rail: None,
        };
        match &log.event {
            LedgerEvent::Funded { from, amount, .. } => {
                entry.actor = Some(from.clone());
                entry.amount = Some(*amount);
            }
            LedgerEvent::Released { to, amount, rail, .. } => {
                entry.actor = Some(to.clone());
                entry.amount = Some(*amount);
                entry.rail = Some(*rail);
            }
            _ => {}
        }

        // Released and canceled are terminal: once either is set no other
        // flag may turn on. Re-setting an already-true flag is fine.
        let terminal = milestone.is_terminal();
        let flag = match kind {
            EventKind::Funded => &mut milestone.funded,
            EventKind::Released => &mut milestone.released,
            EventKind::Canceled => &mut milestone.canceled,
            EventKind::Created => return,
        };
        if terminal && !*flag {
            self.stats.terminal_conflicts += 1;
            tracing::warn!(
                id,
                %kind,
                tx = %log.meta.tx_hash,
                "event after terminal state, flag left unchanged"
            );
        } else {
            *flag = true;
        }

        milestone.last_event_block = milestone.last_event_block.max(log.meta.block_number);
        milestone.events.push(entry);
        self.stats.applied += 1;
    }

    fn create(&mut self, log: &DecodedLog, event_id: String) {
        let LedgerEvent::Created {
            id,
            client,
            worker,
            amount,
            reference: reference_hex,
            rail,
        } = &log.event
        else {
            return;
        };

        if self.milestones.contains_key(id) {
            // Duplicate delivery or a misbehaving ledger: keep the first record.
            self.stats.duplicates += 1;
            tracing::debug!(id, tx = %log.meta.tx_hash, "ignoring repeated Created event");
            return;
        }
        self.seen.insert(event_id.clone());

        let entry = MilestoneEvent {
            id: event_id,
            milestone_id: *id,
            kind: EventKind::Created,
            block_number: log.meta.block_number,
            transaction_hash: log.meta.tx_hash.clone(),
            actor: Some(client.clone()),
            amount: Some(*amount),
            rail: Some(*rail),
        };

        self.milestones.insert(
            *id,
            Milestone {
                id: *id,
                client: client.clone(),
                worker: worker.clone(),
                amount: *amount,
                rail: *rail,
                reference: reference::decode(reference_hex),
                reference_hex: *reference_hex,
                funded: false,
                released: false,
                canceled: false,
                extra: None,
                created_block: log.meta.block_number,
                last_event_block: log.meta.block_number,
                events: vec![entry],
            },
        );
        self.stats.created += 1;
    }

    pub fn stats(&self) -> AggregateStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.milestones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.milestones.is_empty()
    }

    pub fn get(&self, id: MilestoneId) -> Option<&Milestone> {
        self.milestones.get(&id)
    }

    /// Finish the fold, yielding records keyed by id.
    pub fn into_milestones(self) -> BTreeMap<MilestoneId, Milestone> {
        self.milestones
    }
}
