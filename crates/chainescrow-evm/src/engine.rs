//! `MilestoneEngine`: one query from node to view.
//!
//! fetch (settlement ‖ rails) → decode → aggregate + correlate → assemble.
//! Nothing is shared between queries; every call recomputes from the node.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use chainescrow_core::{
    reputation_feed, AddressBook, AggregateStats, Milestone, MilestoneAggregator, MilestoneView,
    RailCorrelator, ReputationRecord, ViewAssembler, ViewError, RECENT_EVENT_LIMIT,
};
use chainescrow_rpc::TransportError;

use crate::abi::LedgerSignature;
use crate::decoder::{DecodeStats, EventDecoder};
use crate::fetcher::{BlockRange, EvmRpcClient, LedgerLogs, LogFetcher, RawLog};
use crate::reads::{self, OpenEscrow};

/// Default look-back window in blocks.
pub const DEFAULT_WINDOW: u64 = 200_000;

/// Tunables for the query pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Blocks below the head covered when `fromBlock` is absent.
    pub window: u64,
    /// Request-scoped deadline for all node calls of one query.
    pub deadline_ms: u64,
    /// Split `eth_getLogs` ranges larger than this. `None` = one call.
    pub max_block_range: Option<u64>,
    /// Events kept by the recent variant and the reputation feed.
    pub recent_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            deadline_ms: 20_000,
            max_block_range: None,
            recent_limit: RECENT_EVENT_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

/// Inbound query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MilestoneQuery {
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
    /// Participant filter, matched against client or worker.
    pub address: Option<String>,
}

/// Everything the pure stages observed for one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub decode: DecodeStats,
    pub aggregate: AggregateStats,
    /// Milestones that received a settlement payload.
    pub correlated: usize,
}

/// Pure part of the pipeline: decode, fold, correlate, assemble.
///
/// Deterministic over its input; running it twice over the same logs gives
/// the same view.
pub fn build_view(
    decoder: &EventDecoder,
    logs: &LedgerLogs,
    participant: Option<&str>,
) -> (MilestoneView, PipelineStats) {
    let settlement = decoder.decode_all(&logs.settlement);
    let rails = decoder.decode_all(&logs.rails);

    let mut aggregator = MilestoneAggregator::new();
    aggregator.extend(&settlement.logs);
    let aggregate = aggregator.stats();

    let correlator = RailCorrelator::from_logs(&rails.logs);
    let mut milestones = aggregator.into_milestones();
    let correlated = correlator.attach(&mut milestones);

    let view = ViewAssembler::new(participant).assemble(milestones.into_values());

    let mut decode = settlement.stats;
    decode.merge(rails.stats);
    (
        view,
        PipelineStats {
            decode,
            aggregate,
            correlated,
        },
    )
}

/// Runs milestone, reputation and contract-read queries against one node
/// and one address book.
#[derive(Clone)]
pub struct MilestoneEngine {
    client: Arc<dyn EvmRpcClient>,
    book: AddressBook,
    config: EngineConfig,
    fetcher: LogFetcher,
    decoder: EventDecoder,
}

impl MilestoneEngine {
    pub fn new(client: Arc<dyn EvmRpcClient>, book: AddressBook, config: EngineConfig) -> Self {
        let fetcher = LogFetcher::new(client.clone(), config.max_block_range);
        Self {
            client,
            book,
            config,
            fetcher,
            decoder: EventDecoder::new(),
        }
    }

    pub fn address_book(&self) -> &AddressBook {
        &self.book
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Full variant: visible milestones and all of their history.
    pub async fn milestones(&self, query: &MilestoneQuery) -> Result<MilestoneView, ViewError> {
        let logs = self.with_deadline(self.fetch_ledgers(query)).await?;
        let (view, stats) = build_view(&self.decoder, &logs, query.address.as_deref());

        tracing::debug!(
            decoded = stats.decode.decoded,
            unknown = stats.decode.unknown,
            removed = stats.decode.removed,
            anomalies = stats.decode.anomalies,
            duplicates = stats.aggregate.duplicates,
            orphaned = stats.aggregate.orphaned,
            terminal_conflicts = stats.aggregate.terminal_conflicts,
            correlated = stats.correlated,
            "pipeline stages complete"
        );
        if stats.decode.anomalies > 0 {
            tracing::warn!(
                anomalies = stats.decode.anomalies,
                "some log arguments were replaced by zero values"
            );
        }
        tracing::info!(
            from = ?query.from_block,
            to = ?query.to_block,
            settlement_logs = logs.settlement.len(),
            rail_logs = logs.rails.len(),
            milestones = view.milestones.len(),
            events = view.events.len(),
            "milestone query served"
        );
        Ok(view)
    }

    /// Recent variant: history capped to the newest `recent_limit` events.
    pub async fn recent(&self, query: &MilestoneQuery) -> Result<MilestoneView, ViewError> {
        Ok(self.milestones(query).await?.recent(self.config.recent_limit))
    }

    /// Bare-list variant.
    pub async fn list(&self, query: &MilestoneQuery) -> Result<Vec<Milestone>, ViewError> {
        Ok(self.milestones(query).await?.into_milestones())
    }

    /// Newest reputation proofs minted inside the default window.
    pub async fn reputation(&self) -> Result<Vec<ReputationRecord>, ViewError> {
        let ledger = self.book.require_reputation()?.to_string();
        let logs = self.with_deadline(self.fetch_reputation(ledger)).await?;

        let batch = self.decoder.decode_all(&logs);
        let feed = reputation_feed(&batch.logs, self.config.recent_limit);
        tracing::info!(
            logs = logs.len(),
            records = feed.len(),
            anomalies = batch.stats.anomalies,
            "reputation query served"
        );
        Ok(feed)
    }

    /// Open escrows `owner` participates in, read from the settlement ledger.
    pub async fn open_escrows(&self, owner: &str) -> Result<Vec<OpenEscrow>, ViewError> {
        let deadline = self.config.deadline();
        tokio::time::timeout(
            deadline,
            reads::open_escrows(self.client.as_ref(), &self.book.escrow, owner),
        )
        .await
        .map_err(|_| deadline_exceeded(deadline))?
    }

    /// `decimals()` of the configured payment token.
    pub async fn token_decimals(&self) -> Result<u8, ViewError> {
        let token = self.book.require_token()?;
        let deadline = self.config.deadline();
        tokio::time::timeout(deadline, reads::token_decimals(self.client.as_ref(), token))
            .await
            .map_err(|_| deadline_exceeded(deadline))?
    }

    async fn range(
        &self,
        from: Option<u64>,
        to: Option<u64>,
    ) -> Result<Option<BlockRange>, TransportError> {
        let head = match (from, to) {
            (Some(_), Some(to)) => to,
            _ => self.fetcher.head_block_number().await?,
        };
        Ok(BlockRange::resolve(head, from, to, self.config.window))
    }

    async fn fetch_ledgers(&self, query: &MilestoneQuery) -> Result<LedgerLogs, TransportError> {
        let Some(range) = self.range(query.from_block, query.to_block).await? else {
            tracing::debug!(
                from = ?query.from_block,
                to = ?query.to_block,
                "empty block range"
            );
            return Ok(LedgerLogs::default());
        };
        tracing::debug!(from = range.from, to = range.to, "fetching ledger logs");
        self.fetcher.fetch_ledgers(&self.book, range).await
    }

    async fn fetch_reputation(&self, ledger: String) -> Result<Vec<RawLog>, TransportError> {
        let Some(range) = self.range(None, None).await? else {
            return Ok(Vec::new());
        };
        self.fetcher
            .logs(
                vec![ledger],
                vec![LedgerSignature::ReputationMinted.topic0()],
                range,
            )
            .await
    }

    async fn with_deadline<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, TransportError>>,
    ) -> Result<T, ViewError> {
        let deadline = self.config.deadline();
        match tokio::time::timeout(deadline, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "node request failed");
                Err(ViewError::Rpc(e.to_string()))
            }
            Err(_) => {
                tracing::error!(deadline_ms = self.config.deadline_ms, "deadline exceeded");
                Err(deadline_exceeded(deadline))
            }
        }
    }
}

fn deadline_exceeded(deadline: Duration) -> ViewError {
    ViewError::DeadlineExceeded {
        ms: deadline.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = EngineConfig::default();
        assert_eq!(c.window, 200_000);
        assert_eq!(c.deadline(), Duration::from_secs(20));
        assert_eq!(c.max_block_range, None);
        assert_eq!(c.recent_limit, 12);
    }

    #[test]
    fn empty_logs_give_empty_view() {
        let (view, stats) = build_view(&EventDecoder::new(), &LedgerLogs::default(), None);
        assert!(view.milestones.is_empty());
        assert!(view.events.is_empty());
        assert_eq!(stats, PipelineStats::default());
    }
}
