//! Response shaping: participant filter, deterministic ordering, caps.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::types::{Milestone, MilestoneEvent};

/// Number of events kept by the recent-activity variant.
pub const RECENT_EVENT_LIMIT: usize = 12;

/// `{ milestones, events }` as handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneView {
    /// Visible milestones, highest id first.
    pub milestones: Vec<Milestone>,
    /// History of the visible milestones, newest first.
    pub events: Vec<MilestoneEvent>,
}

impl MilestoneView {
    /// Keep only the `limit` most recent events.
    pub fn recent(mut self, limit: usize) -> Self {
        self.events.truncate(limit);
        self
    }

    /// The bare-list variant.
    pub fn into_milestones(self) -> Vec<Milestone> {
        self.milestones
    }
}

/// Newest first: block number descending, then transaction hash descending.
///
/// The hash tie-break is only there to make output reproducible; it says
/// nothing about execution order inside a block.
pub fn compare_events(a: &MilestoneEvent, b: &MilestoneEvent) -> Ordering {
    b.block_number
        .cmp(&a.block_number)
        .then_with(|| b.transaction_hash.cmp(&a.transaction_hash))
}

/// Builds a [`MilestoneView`] out of aggregated records.
#[derive(Debug, Clone, Default)]
pub struct ViewAssembler {
    participant: Option<String>,
}

impl ViewAssembler {
    /// `participant` restricts output to milestones where it is client or
    /// worker (case-insensitive). Blank filters are treated as absent.
    pub fn new(participant: Option<&str>) -> Self {
        Self {
            participant: participant
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_ascii_lowercase),
        }
    }

    pub fn is_visible(&self, milestone: &Milestone) -> bool {
        match &self.participant {
            Some(address) => milestone.involves(address),
            None => true,
        }
    }

    pub fn assemble(&self, milestones: impl IntoIterator<Item = Milestone>) -> MilestoneView {
        let mut visible: Vec<Milestone> = milestones
            .into_iter()
            .filter(|m| self.is_visible(m))
            .map(|mut m| {
                m.events.sort_by(compare_events);
                m
            })
            .collect();
        visible.sort_by(|a, b| b.id.cmp(&a.id));

        // Only events attached to visible milestones make it into the feed.
        let mut events: Vec<MilestoneEvent> = visible
            .iter()
            .flat_map(|m| m.events.iter().cloned())
            .collect();
        events.sort_by(compare_events);

        MilestoneView {
            milestones: visible,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference;
    use crate::types::{EventKind, MilestoneId, RailKind};
    use alloy_primitives::U256;

    const A: &str = "0xAAAAaaaaAAAAaaaaAAAAaaaaAAAAaaaaAAAAaaaa";
    const B: &str = "0xBBBBbbbbBBBBbbbbBBBBbbbbBBBBbbbbBBBBbbbb";
    const C: &str = "0xCCCCccccCCCCccccCCCCccccCCCCccccCCCCcccc";

    fn event(id: MilestoneId, kind: EventKind, block: u64, tx: &str) -> MilestoneEvent {
        MilestoneEvent {
            id: MilestoneEvent::event_id(id, kind, tx),
            milestone_id: id,
            kind,
            block_number: block,
            transaction_hash: tx.into(),
            actor: None,
            amount: None,
            rail: None,
        }
    }

    fn milestone(id: MilestoneId, client: &str, worker: &str, events: Vec<MilestoneEvent>) -> Milestone {
        Milestone {
            id,
            client: client.into(),
            worker: worker.into(),
            amount: U256::from(10u64),
            rail: RailKind::Primary,
            reference: String::new(),
            reference_hex: reference::encode(""),
            funded: false,
            released: false,
            canceled: false,
            extra: None,
            created_block: 1,
            last_event_block: 1,
            events,
        }
    }

    fn sample() -> Vec<Milestone> {
        vec![
            milestone(1, A, B, vec![event(1, EventKind::Created, 10, "0x01")]),
            milestone(2, B, C, vec![event(2, EventKind::Created, 11, "0x02")]),
            milestone(3, A, C, vec![event(3, EventKind::Created, 12, "0x03")]),
        ]
    }

    #[test]
    fn filter_matches_client_or_worker_case_insensitively() {
        let shouted = B.to_uppercase().replace("0X", "0x");
        let view = ViewAssembler::new(Some(shouted.as_str())).assemble(sample());
        let ids: Vec<_> = view.milestones.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert!(view.events.iter().all(|e| e.milestone_id != 3));
    }

    #[test]
    fn no_filter_sorts_by_id_descending() {
        let view = ViewAssembler::new(None).assemble(sample());
        let ids: Vec<_> = view.milestones.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn blank_filter_is_ignored() {
        let view = ViewAssembler::new(Some("  ")).assemble(sample());
        assert_eq!(view.milestones.len(), 3);
    }

    #[test]
    fn events_sorted_by_block_then_hash_descending() {
        let ms = vec![milestone(
            1,
            A,
            B,
            vec![
                event(1, EventKind::Created, 5, "0x0a"),
                event(1, EventKind::Funded, 7, "0x0b"),
                event(1, EventKind::Released, 7, "0x0c"),
            ],
        )];
        let view = ViewAssembler::new(None).assemble(ms);
        let order: Vec<_> = view.events.iter().map(|e| e.transaction_hash.as_str()).collect();
        assert_eq!(order, vec!["0x0c", "0x0b", "0x0a"]);
        assert_eq!(view.milestones[0].events[0].kind, EventKind::Released);
    }

    #[test]
    fn recent_caps_event_feed() {
        let events = (0..20)
            .map(|i| event(1, EventKind::Funded, i, &format!("0x{i:02x}")))
            .collect();
        let view = ViewAssembler::new(None)
            .assemble(vec![milestone(1, A, B, events)])
            .recent(RECENT_EVENT_LIMIT);
        assert_eq!(view.events.len(), RECENT_EVENT_LIMIT);
        assert_eq!(view.events[0].block_number, 19);
        // Per-milestone history is not capped.
        assert_eq!(view.milestones[0].events.len(), 20);
    }
}
