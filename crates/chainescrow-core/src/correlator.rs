//! Joins rail-ledger settlements to milestones by shared reference.
//!
//! Neither ledger knows the other's address: the reference value is the only
//! link between milestone creation and payment settlement.

use std::collections::{BTreeMap, HashMap};

use alloy_primitives::{Bytes, B256};

use crate::types::{DecodedLog, LedgerEvent, Milestone, MilestoneId, RailSettlement};

/// Reference → settlement payload index, built fresh per query.
#[derive(Debug, Default)]
pub struct RailCorrelator {
    extras: HashMap<B256, Bytes>,
    duplicates: usize,
}

impl RailCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every `RailSettled` event in `logs`, across all rail ledgers.
    pub fn from_logs<'a>(logs: impl IntoIterator<Item = &'a DecodedLog>) -> Self {
        let mut correlator = Self::new();
        for log in logs {
            if let LedgerEvent::RailSettled(settlement) = &log.event {
                correlator.record(settlement);
            }
        }
        correlator
    }

    /// Record one settlement. The first payload seen for a reference wins.
    pub fn record(&mut self, settlement: &RailSettlement) {
        if self.extras.contains_key(&settlement.reference) {
            self.duplicates += 1;
            tracing::debug!(reference = %settlement.reference, "duplicate rail settlement reference, keeping first");
            return;
        }
        self.extras
            .insert(settlement.reference, settlement.extra.clone());
    }

    pub fn lookup(&self, reference: &B256) -> Option<&Bytes> {
        self.extras.get(reference)
    }

    /// Set `extra` on every milestone whose reference has a settlement.
    /// Returns the number of milestones enriched.
    pub fn attach(&self, milestones: &mut BTreeMap<MilestoneId, Milestone>) -> usize {
        let mut attached = 0;
        for milestone in milestones.values_mut() {
            if let Some(extra) = self.lookup(&milestone.reference_hex) {
                milestone.extra = Some(extra.clone());
                attached += 1;
            }
        }
        attached
    }

    pub fn len(&self) -> usize {
        self.extras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extras.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}
