//! `EventDecoder`: raw ledger logs into typed [`LedgerEvent`]s.
//!
//! Decoding never fails a batch. Unknown topic0 values are dropped, removed
//! logs are skipped, and arguments that do not fit their expected shape fall
//! back to zero values (zero integer, zero address, empty bytes). Every such
//! fallback is counted in [`DecodeStats::anomalies`] and logged at `warn`.

use std::collections::HashMap;
use std::fmt::Display;

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes, B256, U256};

use chainescrow_core::{DecodedLog, LedgerEvent, LogMeta, MilestoneId, RailKind, RailSettlement};

use crate::abi::LedgerSignature;
use crate::fetcher::RawLog;

/// Counters for one decoded batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub decoded: usize,
    /// Logs whose topic0 matches no known event.
    pub unknown: usize,
    /// Logs flagged `removed` by the node.
    pub removed: usize,
    /// Arguments replaced by a zero value.
    pub anomalies: usize,
}

impl DecodeStats {
    pub fn merge(&mut self, other: DecodeStats) {
        self.decoded += other.decoded;
        self.unknown += other.unknown;
        self.removed += other.removed;
        self.anomalies += other.anomalies;
    }
}

/// Decoded events plus what happened along the way.
#[derive(Debug, Clone, Default)]
pub struct DecodedBatch {
    pub logs: Vec<DecodedLog>,
    pub stats: DecodeStats,
}

/// Decoder for every ledger event the read model understands.
#[derive(Debug, Clone)]
pub struct EventDecoder {
    by_topic: HashMap<B256, LedgerSignature>,
}

impl Default for EventDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDecoder {
    pub fn new() -> Self {
        Self {
            by_topic: LedgerSignature::ALL
                .iter()
                .map(|sig| (sig.topic0(), *sig))
                .collect(),
        }
    }

    /// Resolve a log's topic0 to a known signature.
    pub fn signature_of(&self, raw: &RawLog) -> Option<LedgerSignature> {
        let topic = raw.topics.first()?.parse::<B256>().ok()?;
        self.by_topic.get(&topic).copied()
    }

    /// Decode a batch, preserving input order.
    pub fn decode_all(&self, raws: &[RawLog]) -> DecodedBatch {
        let mut batch = DecodedBatch::default();
        for raw in raws {
            if let Some(log) = self.decode(raw, &mut batch.stats) {
                batch.logs.push(log);
            }
        }
        batch
    }

    /// Decode one log, updating `stats`. Returns `None` for removed logs and
    /// unknown events.
    pub fn decode(&self, raw: &RawLog, stats: &mut DecodeStats) -> Option<DecodedLog> {
        if raw.is_removed() {
            stats.removed += 1;
            return None;
        }
        let Some(signature) = self.signature_of(raw) else {
            stats.unknown += 1;
            tracing::trace!(
                tx_hash = %raw.tx_hash,
                topic0 = raw.topics.first().map(String::as_str).unwrap_or(""),
                "skipping unknown event"
            );
            return None;
        };

        let mut args = ArgReader::new(raw, signature);
        let event = match signature {
            LedgerSignature::MilestoneCreated => LedgerEvent::Created {
                id: args.topic_id(1, "id"),
                client: args.topic_address(2, "client"),
                worker: args.topic_address(3, "worker"),
                amount: args.data_uint(0, "amount"),
                reference: args.data_b256(1, "ref"),
                rail: args.data_rail(2, "rail"),
            },
            LedgerSignature::Funded => LedgerEvent::Funded {
                id: args.topic_id(1, "id"),
                from: args.topic_address(2, "from"),
                amount: args.data_uint(0, "amount"),
            },
            LedgerSignature::Released => LedgerEvent::Released {
                id: args.topic_id(1, "id"),
                to: args.topic_address(2, "to"),
                amount: args.data_uint(0, "amount"),
                rail: args.data_rail(1, "rail"),
            },
            LedgerSignature::Canceled => LedgerEvent::Canceled {
                id: args.topic_id(1, "id"),
            },
            LedgerSignature::RailSettled => LedgerEvent::RailSettled(RailSettlement {
                escrow: args.topic_address(1, "escrow"),
                payer: args.topic_address(2, "payer"),
                payee: args.topic_address(3, "payee"),
                amount: args.data_uint(0, "amount"),
                reference: args.data_b256(1, "ref"),
                extra: args.data_bytes(2, "extra"),
            }),
            LedgerSignature::ReputationMinted => LedgerEvent::ReputationMinted {
                proof_id: args.topic_uint(1, "proofId"),
                client: args.topic_address(2, "client"),
                worker: args.topic_address(3, "worker"),
                amount: args.data_uint(0, "amount"),
                reference: args.data_b256(1, "ref"),
                onchain: args.data_bool(2, "onchain"),
            },
        };

        stats.anomalies += args.anomalies;
        stats.decoded += 1;
        Some(DecodedLog {
            meta: LogMeta {
                address: raw.address.clone(),
                block_number: raw.block_number_u64(),
                tx_hash: raw.tx_hash.clone(),
                log_index: raw.log_index_u32(),
            },
            event,
        })
    }
}

// ─── Defensive argument access ───────────────────────────────────────────────

/// Reads one log's arguments, substituting zero values for anything that
/// does not fit.
struct ArgReader<'a> {
    raw: &'a RawLog,
    event: &'static str,
    /// Fully decoded data tuple, when the payload matched the expected types.
    values: Option<Vec<DynSolValue>>,
    /// Raw payload, used word by word when full decoding failed.
    data: Vec<u8>,
    anomalies: usize,
}

impl<'a> ArgReader<'a> {
    fn new(raw: &'a RawLog, signature: LedgerSignature) -> Self {
        let mut reader = Self {
            raw,
            event: signature.name(),
            values: None,
            data: Vec::new(),
            anomalies: 0,
        };

        let hex_data = raw.data.strip_prefix("0x").unwrap_or(&raw.data);
        match hex::decode(hex_data) {
            Ok(bytes) => reader.data = bytes,
            Err(e) => reader.anomaly("data", format!("invalid hex payload: {e}")),
        }

        if signature.data_args().is_empty() {
            reader.values = Some(Vec::new());
        } else if !reader.data.is_empty() {
            match signature.data_type().abi_decode_params(&reader.data) {
                Ok(DynSolValue::Tuple(values)) => reader.values = Some(values),
                Ok(other) => reader.values = Some(vec![other]),
                Err(e) => reader.anomaly("data", format!("payload does not match ABI: {e}")),
            }
        }
        reader
    }

    fn anomaly(&mut self, arg: &str, reason: impl Display) {
        self.anomalies += 1;
        tracing::warn!(
            tx_hash = %self.raw.tx_hash,
            log_index = %self.raw.log_index,
            event = self.event,
            arg,
            %reason,
            "decoding anomaly, using zero value"
        );
    }

    fn topic(&mut self, index: usize, name: &str) -> Option<B256> {
        let Some(topic) = self.raw.topics.get(index) else {
            self.anomaly(name, "missing topic");
            return None;
        };
        match topic.parse::<B256>() {
            Ok(word) => Some(word),
            Err(e) => {
                self.anomaly(name, format!("invalid topic '{topic}': {e}"));
                None
            }
        }
    }

    fn topic_uint(&mut self, index: usize, name: &str) -> U256 {
        self.topic(index, name)
            .map(|w| U256::from_be_bytes(w.0))
            .unwrap_or(U256::ZERO)
    }

    fn topic_id(&mut self, index: usize, name: &str) -> MilestoneId {
        let value = self.topic_uint(index, name);
        self.fit_u64(value, name)
    }

    fn topic_address(&mut self, index: usize, name: &str) -> String {
        let address = match self.topic(index, name) {
            Some(word) if word[..12].iter().all(|b| *b == 0) => Address::from_word(word),
            Some(word) => {
                self.anomaly(name, format!("topic {word} is not a left-padded address"));
                Address::ZERO
            }
            None => Address::ZERO,
        };
        address.to_checksum(None)
    }

    /// Data word `index`, for static arguments when full decoding failed.
    fn word(&mut self, index: usize, name: &str) -> Option<B256> {
        let start = index * 32;
        match self.data.get(start..start + 32) {
            Some(bytes) => Some(B256::from_slice(bytes)),
            None => {
                self.anomaly(name, "payload too short");
                None
            }
        }
    }

    fn value(&self, index: usize) -> Option<&DynSolValue> {
        self.values.as_ref().and_then(|v| v.get(index))
    }

    fn data_uint(&mut self, index: usize, name: &str) -> U256 {
        if self.values.is_some() {
            return match self.value(index) {
                Some(DynSolValue::Uint(v, _)) => *v,
                _ => {
                    self.anomaly(name, "expected an unsigned integer");
                    U256::ZERO
                }
            };
        }
        self.word(index, name)
            .map(|w| U256::from_be_bytes(w.0))
            .unwrap_or(U256::ZERO)
    }

    fn data_b256(&mut self, index: usize, name: &str) -> B256 {
        if self.values.is_some() {
            return match self.value(index) {
                Some(DynSolValue::FixedBytes(word, _)) => *word,
                _ => {
                    self.anomaly(name, "expected bytes32");
                    B256::ZERO
                }
            };
        }
        self.word(index, name).unwrap_or(B256::ZERO)
    }

    fn data_bool(&mut self, index: usize, name: &str) -> bool {
        if self.values.is_some() {
            return match self.value(index) {
                Some(DynSolValue::Bool(b)) => *b,
                _ => {
                    self.anomaly(name, "expected a bool");
                    false
                }
            };
        }
        self.word(index, name).is_some_and(|w| !w.is_zero())
    }

    fn data_rail(&mut self, index: usize, name: &str) -> RailKind {
        let code = self.data_uint(index, name);
        // Any non-zero code, however large, is the alternate rail.
        RailKind::from_code(if code.is_zero() { 0 } else { 1 })
    }

    fn data_bytes(&mut self, index: usize, name: &str) -> Bytes {
        match self.value(index) {
            Some(DynSolValue::Bytes(bytes)) => Bytes::from(bytes.clone()),
            Some(_) => {
                self.anomaly(name, "expected dynamic bytes");
                Bytes::new()
            }
            None => {
                self.anomaly(name, "dynamic bytes unavailable");
                Bytes::new()
            }
        }
    }

    fn fit_u64(&mut self, value: U256, name: &str) -> u64 {
        if value > U256::from(u64::MAX) {
            self.anomaly(name, format!("{value} does not fit in u64"));
            return 0;
        }
        value.as_limbs()[0]
    }
}
