//! Ledger log fetcher.
//!
//! Uses JSON-RPC `eth_blockNumber` and `eth_getLogs`. The settlement ledger
//! and every rail ledger are fetched concurrently and awaited jointly: one
//! failing ledger fails the whole fetch.

use std::sync::Arc;

use alloy_primitives::B256;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use chainescrow_core::AddressBook;
use chainescrow_rpc::TransportError;

use crate::abi::{topics_for, LedgerSignature};

/// A raw EVM log as returned by `eth_getLogs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
    #[serde(rename = "blockNumber", default)]
    pub block_number: String,
    #[serde(rename = "blockHash", default)]
    pub block_hash: String,
    #[serde(rename = "transactionHash", default)]
    pub tx_hash: String,
    #[serde(rename = "logIndex", default)]
    pub log_index: String,
    #[serde(default)]
    pub removed: Option<bool>,
}

impl RawLog {
    /// Returns the block number as u64.
    pub fn block_number_u64(&self) -> u64 {
        parse_hex_u64(&self.block_number)
    }

    /// Returns the log index as u32.
    pub fn log_index_u32(&self) -> u32 {
        parse_hex_u64(&self.log_index) as u32
    }

    /// Returns `true` if this log was removed by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }
}

/// `eth_getLogs` filter: any of `addresses`, topic0 in `topics0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub addresses: Vec<String>,
    pub topics0: Vec<B256>,
    pub from_block: u64,
    pub to_block: u64,
}

/// The node operations the read model needs.
#[async_trait]
pub trait EvmRpcClient: Send + Sync {
    async fn block_number(&self) -> Result<u64, TransportError>;
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, TransportError>;
    /// `eth_call` against `to` at the latest block; returns raw return data.
    async fn call(&self, to: &str, data: Vec<u8>) -> Result<Vec<u8>, TransportError>;
}

/// Inclusive block range of one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    /// Fill in defaults: `to` is the head, `from` is `head - window` clamped
    /// to 0. Returns `None` when the range is empty (`from > to`).
    pub fn resolve(head: u64, from: Option<u64>, to: Option<u64>, window: u64) -> Option<Self> {
        let to = to.unwrap_or(head);
        let from = from.unwrap_or_else(|| head.saturating_sub(window));
        (from <= to).then_some(Self { from, to })
    }

    /// Split into consecutive sub-ranges of at most `max_range + 1` blocks.
    pub fn chunks(self, max_range: Option<u64>) -> Vec<BlockRange> {
        let Some(max_range) = max_range else {
            return vec![self];
        };
        let mut out = Vec::new();
        let mut start = self.from;
        loop {
            let end = start.saturating_add(max_range).min(self.to);
            out.push(BlockRange { from: start, to: end });
            if end >= self.to {
                break;
            }
            start = end + 1;
        }
        out
    }
}

/// Raw logs of one query, split by source.
#[derive(Debug, Clone, Default)]
pub struct LedgerLogs {
    /// Settlement-ledger logs, in node order.
    pub settlement: Vec<RawLog>,
    /// Rail-ledger logs, rail by rail in address-book order.
    pub rails: Vec<RawLog>,
}

/// Wraps an `EvmRpcClient` and adds range chunking and the joint fetch.
#[derive(Clone)]
pub struct LogFetcher {
    client: Arc<dyn EvmRpcClient>,
    max_block_range: Option<u64>,
}

impl LogFetcher {
    pub fn new(client: Arc<dyn EvmRpcClient>, max_block_range: Option<u64>) -> Self {
        Self {
            client,
            max_block_range,
        }
    }

    /// Fetch the current chain head block number.
    pub async fn head_block_number(&self) -> Result<u64, TransportError> {
        self.client.block_number().await
    }

    /// Fetch all logs in `range` for `addresses` and `topics0`.
    /// Splits the range sequentially when `max_block_range` is set.
    pub async fn logs(
        &self,
        addresses: Vec<String>,
        topics0: Vec<B256>,
        range: BlockRange,
    ) -> Result<Vec<RawLog>, TransportError> {
        let mut all_logs = Vec::new();
        for chunk in range.chunks(self.max_block_range) {
            let filter = LogFilter {
                addresses: addresses.clone(),
                topics0: topics0.clone(),
                from_block: chunk.from,
                to_block: chunk.to,
            };
            let logs = self.client.get_logs(&filter).await?;
            tracing::trace!(
                from = chunk.from,
                to = chunk.to,
                count = logs.len(),
                "fetched log chunk"
            );
            all_logs.extend(logs);
        }
        Ok(all_logs)
    }

    /// Settlement-ledger logs and every rail's `RailSettled` logs, fetched
    /// concurrently. Any single failure fails the whole call.
    pub async fn fetch_ledgers(
        &self,
        book: &AddressBook,
        range: BlockRange,
    ) -> Result<LedgerLogs, TransportError> {
        let settlement = self.logs(
            vec![book.escrow.clone()],
            topics_for(&LedgerSignature::SETTLEMENT),
            range,
        );
        let rails = try_join_all(book.rail_addresses().map(|address| {
            self.logs(
                vec![address.to_string()],
                vec![LedgerSignature::RailSettled.topic0()],
                range,
            )
        }));

        let (settlement, rails) = tokio::try_join!(settlement, rails)?;
        Ok(LedgerLogs {
            settlement,
            rails: rails.into_iter().flatten().collect(),
        })
    }
}

/// Parse a hex-encoded string (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> u64 {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).unwrap_or(0)
}
