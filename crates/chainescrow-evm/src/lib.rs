//! chainescrow-evm: node-facing half of the milestone read model.
//!
//! - [`abi`]: ledger event signatures, topic0 and call selectors
//! - [`EventDecoder`]: tolerant raw log → [`LedgerEvent`](chainescrow_core::LedgerEvent) decoding
//! - [`LogFetcher`]: chunked `eth_getLogs`, settlement and rails fetched jointly
//! - [`RpcEvmClient`]: [`EvmRpcClient`] over a JSON-RPC transport
//! - [`MilestoneEngine`]: one query from node to [`MilestoneView`](chainescrow_core::MilestoneView)

pub mod abi;
pub mod client;
pub mod decoder;
pub mod engine;
pub mod fetcher;
pub mod reads;

pub use abi::LedgerSignature;
pub use client::RpcEvmClient;
pub use decoder::{DecodeStats, DecodedBatch, EventDecoder};
pub use engine::{build_view, EngineConfig, MilestoneEngine, MilestoneQuery, PipelineStats};
pub use fetcher::{BlockRange, EvmRpcClient, LedgerLogs, LogFetcher, LogFilter, RawLog};
pub use reads::OpenEscrow;
