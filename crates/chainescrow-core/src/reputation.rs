//! Recent reputation proofs minted by the reputation ledger.

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};

use crate::serde_helpers::{u256_decimal, u64_string};
use crate::types::{DecodedLog, LedgerEvent};

/// One minted reputation proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationRecord {
    #[serde(with = "u256_decimal")]
    pub proof_id: U256,
    pub client: String,
    pub worker: String,
    #[serde(with = "u256_decimal")]
    pub amount: U256,
    #[serde(rename = "ref")]
    pub reference: B256,
    pub onchain: bool,
    #[serde(with = "u64_string")]
    pub block_number: u64,
    pub transaction_hash: String,
}

/// Newest-first feed of `ReputationMinted` events, capped at `limit`.
pub fn reputation_feed<'a>(
    logs: impl IntoIterator<Item = &'a DecodedLog>,
    limit: usize,
) -> Vec<ReputationRecord> {
    let mut records: Vec<ReputationRecord> = logs
        .into_iter()
        .filter_map(|log| match &log.event {
            LedgerEvent::ReputationMinted {
                proof_id,
                client,
                worker,
                amount,
                reference,
                onchain,
            } => Some(ReputationRecord {
                proof_id: *proof_id,
                client: client.clone(),
                worker: worker.clone(),
                amount: *amount,
                reference: *reference,
                onchain: *onchain,
                block_number: log.meta.block_number,
                transaction_hash: log.meta.tx_hash.clone(),
            }),
            _ => None,
        })
        .collect();

    records.sort_by(|a, b| {
        b.block_number
            .cmp(&a.block_number)
            .then_with(|| b.transaction_hash.cmp(&a.transaction_hash))
    });
    records.truncate(limit);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogMeta;

    fn minted(proof: u64, block: u64, tx: &str) -> DecodedLog {
        DecodedLog {
            meta: LogMeta {
                address: "0xrep".into(),
                block_number: block,
                tx_hash: tx.into(),
                log_index: 0,
            },
            event: LedgerEvent::ReputationMinted {
                proof_id: U256::from(proof),
                client: "0xc".into(),
                worker: "0xw".into(),
                amount: U256::from(5u64),
                reference: B256::ZERO,
                onchain: proof % 2 == 0,
            },
        }
    }

    #[test]
    fn feed_is_newest_first_and_capped() {
        let logs: Vec<_> = (0..15).map(|i| minted(i, 100 + i, &format!("0x{i:02x}"))).collect();
        let feed = reputation_feed(&logs, 12);
        assert_eq!(feed.len(), 12);
        assert_eq!(feed[0].block_number, 114);
        assert_eq!(feed[11].block_number, 103);
    }

    #[test]
    fn same_block_ties_break_on_hash() {
        let logs = [minted(1, 7, "0x01"), minted(2, 7, "0x02")];
        let feed = reputation_feed(&logs, 12);
        assert_eq!(feed[0].transaction_hash, "0x02");
        let json = serde_json::to_value(&feed[0]).unwrap();
        assert_eq!(json["proofId"], "2");
        assert_eq!(json["blockNumber"], "7");
        assert!(json["ref"].is_string());
    }
}
