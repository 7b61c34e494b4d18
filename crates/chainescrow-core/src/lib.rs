//! chainescrow-core: the milestone read model.
//!
//! Every query rebuilds the model from scratch out of decoded ledger logs:
//!
//! ```text
//! DecodedLog[] ──┬── MilestoneAggregator  (fold per-milestone state + history)
//!                └── RailCorrelator       (reference → settlement payload)
//!                          │
//!                    ViewAssembler        (participant filter, ordering, caps)
//! ```
//!
//! Nothing in this crate performs I/O. Fetching and ABI decoding live in
//! `chainescrow-evm`.

pub mod aggregator;
pub mod config;
pub mod correlator;
pub mod error;
pub mod reference;
pub mod reputation;
pub mod serde_helpers;
pub mod types;
pub mod view;

pub use aggregator::{AggregateStats, MilestoneAggregator};
pub use config::{AddressBook, AddressEntry, LocalAddresses, RailLedger};
pub use correlator::RailCorrelator;
pub use error::{ConfigError, ViewError};
pub use reputation::{reputation_feed, ReputationRecord};
pub use types::{
    DecodedLog, EventKind, LedgerEvent, LogMeta, Milestone, MilestoneEvent, MilestoneId,
    RailKind, RailSettlement,
};
pub use view::{MilestoneView, ViewAssembler, RECENT_EVENT_LIMIT};
