//! Shared types for the milestone read model.

use alloy_primitives::{Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::serde_helpers::{opt_u256_decimal, u256_decimal, u64_string};

/// Milestone identifier assigned by the settlement ledger at creation.
pub type MilestoneId = u64;

// ─── RailKind ────────────────────────────────────────────────────────────────

/// The payment rail a milestone settles on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RailKind {
    #[serde(rename = "PRIMARY")]
    Primary,
    #[serde(rename = "ALTERNATE")]
    Alternate,
}

impl RailKind {
    /// Map the ledger's `uint8` rail code: `0` is the primary rail, anything
    /// else the alternate one.
    pub fn from_code(code: u64) -> Self {
        if code == 0 {
            Self::Primary
        } else {
            Self::Alternate
        }
    }

    /// Strict variant used for contract reads, where unknown codes are kept
    /// distinguishable.
    pub fn from_code_strict(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Primary),
            1 => Some(Self::Alternate),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Primary => 0,
            Self::Alternate => 1,
        }
    }
}

impl std::fmt::Display for RailKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "PRIMARY"),
            Self::Alternate => write!(f, "ALTERNATE"),
        }
    }
}

// ─── EventKind ───────────────────────────────────────────────────────────────

/// Kinds of settlement-ledger events that make up a milestone's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Created,
    Funded,
    Released,
    Canceled,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Funded => "FUNDED",
            Self::Released => "RELEASED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Decoded ledger events ───────────────────────────────────────────────────

/// Where a decoded event came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogMeta {
    /// Emitting contract address, as returned by the node.
    pub address: String,
    pub block_number: u64,
    /// Transaction hash (`0x…`), as returned by the node.
    pub tx_hash: String,
    pub log_index: u32,
}

/// A settlement observed on one of the payment-rail ledgers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RailSettlement {
    /// Settlement ledger the rail paid out for.
    pub escrow: String,
    pub payer: String,
    pub payee: String,
    pub amount: U256,
    /// Join key against `Milestone::reference_hex`.
    pub reference: B256,
    /// Opaque off-chain anchoring payload (e.g. an external receipt id).
    pub extra: Bytes,
}

/// The closed set of events the read model understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    Created {
        id: MilestoneId,
        client: String,
        worker: String,
        amount: U256,
        reference: B256,
        rail: RailKind,
    },
    Funded {
        id: MilestoneId,
        from: String,
        amount: U256,
    },
    Released {
        id: MilestoneId,
        to: String,
        amount: U256,
        rail: RailKind,
    },
    Canceled {
        id: MilestoneId,
    },
    RailSettled(RailSettlement),
    ReputationMinted {
        proof_id: U256,
        client: String,
        worker: String,
        amount: U256,
        reference: B256,
        onchain: bool,
    },
}

impl LedgerEvent {
    /// The milestone history kind, for settlement-ledger events only.
    pub fn milestone_kind(&self) -> Option<(MilestoneId, EventKind)> {
        match self {
            Self::Created { id, .. } => Some((*id, EventKind::Created)),
            Self::Funded { id, .. } => Some((*id, EventKind::Funded)),
            Self::Released { id, .. } => Some((*id, EventKind::Released)),
            Self::Canceled { id } => Some((*id, EventKind::Canceled)),
            Self::RailSettled(_) | Self::ReputationMinted { .. } => None,
        }
    }
}

/// A typed event tagged with its originating log position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLog {
    pub meta: LogMeta,
    pub event: LedgerEvent,
}

// ─── Read model ──────────────────────────────────────────────────────────────

/// One entry in a milestone's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneEvent {
    /// `"{milestoneId}-{KIND}-{txHash}"`, unique across one query.
    pub id: String,
    pub milestone_id: MilestoneId,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(with = "u64_string")]
    pub block_number: u64,
    pub transaction_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(
        default,
        with = "opt_u256_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rail: Option<RailKind>,
}

impl MilestoneEvent {
    /// Build the composite identity string for an event.
    pub fn event_id(milestone_id: MilestoneId, kind: EventKind, tx_hash: &str) -> String {
        format!("{milestone_id}-{kind}-{tx_hash}")
    }
}

/// Current state of one escrow-like payment agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: MilestoneId,
    pub client: String,
    pub worker: String,
    #[serde(with = "u256_decimal")]
    pub amount: U256,
    pub rail: RailKind,
    /// Reference decoded as trimmed UTF-8; empty when the bytes are not text.
    pub reference: String,
    pub reference_hex: B256,
    pub funded: bool,
    pub released: bool,
    pub canceled: bool,
    /// Settlement payload from a rail ledger with the same reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Bytes>,
    #[serde(with = "u64_string")]
    pub created_block: u64,
    #[serde(with = "u64_string")]
    pub last_event_block: u64,
    /// History for this milestone. Arrival order inside the aggregator,
    /// newest first once assembled into a view.
    #[serde(default)]
    pub events: Vec<MilestoneEvent>,
}

impl Milestone {
    /// `true` once the milestone reached released or canceled.
    pub fn is_terminal(&self) -> bool {
        self.released || self.canceled
    }

    /// Case-insensitive participant match on client or worker.
    pub fn involves(&self, address: &str) -> bool {
        self.client.eq_ignore_ascii_case(address) || self.worker.eq_ignore_ascii_case(address)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Milestone {
        Milestone {
            id: 7,
            client: "0xAbC0000000000000000000000000000000000001".into(),
            worker: "0x00000000000000000000000000000000000000B2".into(),
            amount: U256::from(1_000u64),
            rail: RailKind::Primary,
            reference: "JOB-7".into(),
            reference_hex: crate::reference::encode("JOB-7"),
            funded: true,
            released: false,
            canceled: false,
            extra: None,
            created_block: 100,
            last_event_block: 120,
            events: vec![],
        }
    }

    #[test]
    fn rail_code_mapping() {
        assert_eq!(RailKind::from_code(0), RailKind::Primary);
        assert_eq!(RailKind::from_code(1), RailKind::Alternate);
        assert_eq!(RailKind::from_code(9), RailKind::Alternate);
        assert_eq!(RailKind::from_code_strict(9), None);
    }

    #[test]
    fn milestone_serializes_numbers_as_strings() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["amount"], "1000");
        assert_eq!(json["createdBlock"], "100");
        assert_eq!(json["lastEventBlock"], "120");
        assert_eq!(json["rail"], "PRIMARY");
        assert!(json.get("extra").is_none());
        assert!(json["referenceHex"].as_str().unwrap().starts_with("0x4a4f422d37"));
    }

    #[test]
    fn involves_is_case_insensitive() {
        let m = sample();
        assert!(m.involves("0xabc0000000000000000000000000000000000001"));
        assert!(m.involves("0x00000000000000000000000000000000000000b2"));
        assert!(!m.involves("0x0000000000000000000000000000000000000003"));
    }

    #[test]
    fn event_id_format() {
        assert_eq!(
            MilestoneEvent::event_id(3, EventKind::Released, "0xdead"),
            "3-RELEASED-0xdead"
        );
    }
}
