//! Contract reads used next to the milestone view: open escrows and token
//! decimals.

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use chainescrow_core::serde_helpers::u256_decimal;
use chainescrow_core::{reference, RailKind, ViewError};

use crate::abi::{selector, DECIMALS, GET_OPEN_ESCROWS};
use crate::fetcher::EvmRpcClient;

/// An escrow that is neither released nor canceled, as reported by the
/// settlement ledger itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenEscrow {
    #[serde(with = "u256_decimal")]
    pub id: U256,
    pub client: String,
    pub worker: String,
    #[serde(with = "u256_decimal")]
    pub amount: U256,
    pub reference: String,
    pub reference_hex: B256,
    /// `None` for rail codes the read model does not know.
    pub rail: Option<RailKind>,
    pub funded: bool,
}

fn escrow_tuple() -> DynSolType {
    DynSolType::Tuple(vec![
        DynSolType::Uint(256),
        DynSolType::Address,
        DynSolType::Address,
        DynSolType::Uint(256),
        DynSolType::FixedBytes(32),
        DynSolType::Uint(8),
        DynSolType::Bool,
        DynSolType::Bool,
        DynSolType::Bool,
    ])
}

/// Calldata for `getOpenEscrows(owner)`.
pub fn open_escrows_calldata(owner: Address) -> Vec<u8> {
    let mut data = selector(GET_OPEN_ESCROWS).to_vec();
    data.extend(DynSolValue::Tuple(vec![DynSolValue::Address(owner)]).abi_encode_params());
    data
}

/// Decode the `getOpenEscrows` return payload. Released and canceled
/// entries are dropped, the rest sorted by id descending.
pub fn decode_open_escrows(ret: &[u8]) -> Result<Vec<OpenEscrow>, ViewError> {
    let ty = DynSolType::Tuple(vec![DynSolType::Array(Box::new(escrow_tuple()))]);
    let decoded = ty
        .abi_decode_params(ret)
        .map_err(|e| ViewError::Rpc(format!("malformed getOpenEscrows return: {e}")))?;

    let items = match decoded {
        DynSolValue::Tuple(mut outer) if outer.len() == 1 => match outer.remove(0) {
            DynSolValue::Array(items) => items,
            other => return Err(unexpected(&other)),
        },
        other => return Err(unexpected(&other)),
    };

    let mut open = Vec::with_capacity(items.len());
    for item in items {
        let fields = match item {
            DynSolValue::Tuple(fields) => fields,
            other => return Err(unexpected(&other)),
        };
        let row = EscrowRow::from_fields(&fields).ok_or_else(|| {
            ViewError::Rpc("malformed getOpenEscrows entry".to_string())
        })?;
        if row.released || row.canceled {
            continue;
        }
        open.push(OpenEscrow {
            id: row.id,
            client: row.client.to_checksum(None),
            worker: row.worker.to_checksum(None),
            amount: row.amount,
            reference: reference::decode(&row.reference),
            reference_hex: row.reference,
            rail: RailKind::from_code_strict(row.rail),
            funded: row.funded,
        });
    }
    open.sort_by(|a, b| b.id.cmp(&a.id));
    Ok(open)
}

fn unexpected(value: &DynSolValue) -> ViewError {
    ViewError::Rpc(format!("unexpected getOpenEscrows shape: {value:?}"))
}

struct EscrowRow {
    id: U256,
    client: Address,
    worker: Address,
    amount: U256,
    reference: B256,
    rail: u64,
    funded: bool,
    released: bool,
    canceled: bool,
}

impl EscrowRow {
    fn from_fields(fields: &[DynSolValue]) -> Option<Self> {
        match fields {
            [DynSolValue::Uint(id, _), DynSolValue::Address(client), DynSolValue::Address(worker), DynSolValue::Uint(amount, _), DynSolValue::FixedBytes(reference, _), DynSolValue::Uint(rail, _), DynSolValue::Bool(funded), DynSolValue::Bool(released), DynSolValue::Bool(canceled)] => {
                Some(Self {
                    id: *id,
                    client: *client,
                    worker: *worker,
                    amount: *amount,
                    reference: *reference,
                    rail: if *rail > U256::from(u8::MAX) { u64::MAX } else { rail.as_limbs()[0] },
                    funded: *funded,
                    released: *released,
                    canceled: *canceled,
                })
            }
            _ => None,
        }
    }
}

/// Read the escrows `owner` participates in that are still open.
pub async fn open_escrows(
    client: &dyn EvmRpcClient,
    escrow: &str,
    owner: &str,
) -> Result<Vec<OpenEscrow>, ViewError> {
    let owner: Address = owner.trim().parse().map_err(|_| ViewError::InvalidParameter {
        name: "owner",
        reason: format!("'{owner}' is not a 20-byte hex address"),
    })?;
    let ret = client
        .call(escrow, open_escrows_calldata(owner))
        .await
        .map_err(|e| ViewError::Rpc(e.to_string()))?;
    decode_open_escrows(&ret)
}

/// Read ERC-20 `decimals()` of `token`.
pub async fn token_decimals(client: &dyn EvmRpcClient, token: &str) -> Result<u8, ViewError> {
    let ret = client
        .call(token, selector(DECIMALS).to_vec())
        .await
        .map_err(|e| ViewError::Rpc(e.to_string()))?;
    match DynSolType::Uint(8).abi_decode(&ret) {
        Ok(DynSolValue::Uint(v, _)) if v <= U256::from(u8::MAX) => Ok(v.as_limbs()[0] as u8),
        Ok(other) => Err(ViewError::Rpc(format!("unexpected decimals() value: {other:?}"))),
        Err(e) => Err(ViewError::Rpc(format!("malformed decimals() return: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u64, rail: u64, funded: bool, released: bool, canceled: bool) -> DynSolValue {
        DynSolValue::Tuple(vec![
            DynSolValue::Uint(U256::from(id), 256),
            DynSolValue::Address(Address::repeat_byte(0x0a)),
            DynSolValue::Address(Address::repeat_byte(0x0b)),
            DynSolValue::Uint(U256::from(500), 256),
            DynSolValue::FixedBytes(reference::encode("JOB-1"), 32),
            DynSolValue::Uint(U256::from(rail), 8),
            DynSolValue::Bool(funded),
            DynSolValue::Bool(released),
            DynSolValue::Bool(canceled),
        ])
    }

    fn encode(rows: Vec<DynSolValue>) -> Vec<u8> {
        DynSolValue::Tuple(vec![DynSolValue::Array(rows)]).abi_encode_params()
    }

    #[test]
    fn drops_closed_and_sorts_desc() {
        let ret = encode(vec![
            row(1, 0, true, false, false),
            row(2, 1, true, true, false),
            row(3, 0, false, false, true),
            row(5, 7, false, false, false),
        ]);
        let open = decode_open_escrows(&ret).unwrap();
        let ids: Vec<U256> = open.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![U256::from(5), U256::from(1)]);
        assert_eq!(open[0].rail, None);
        assert_eq!(open[1].rail, Some(RailKind::Primary));
        assert_eq!(open[1].reference, "JOB-1");
        assert!(open[1].funded);
    }

    #[test]
    fn empty_list() {
        assert!(decode_open_escrows(&encode(vec![])).unwrap().is_empty());
    }

    #[test]
    fn garbage_return_is_rpc_error() {
        assert!(matches!(decode_open_escrows(&[1, 2, 3]), Err(ViewError::Rpc(_))));
    }

    #[test]
    fn calldata_starts_with_selector() {
        let data = open_escrows_calldata(Address::repeat_byte(0x0a));
        assert_eq!(&data[..4], &selector(GET_OPEN_ESCROWS));
        assert_eq!(data.len(), 36);
        assert_eq!(data[35], 0x0a);
    }

    #[test]
    fn open_escrow_json_shape() {
        let open = decode_open_escrows(&encode(vec![row(9, 1, false, false, false)])).unwrap();
        let v = serde_json::to_value(&open[0]).unwrap();
        assert_eq!(v["id"], "9");
        assert_eq!(v["amount"], "500");
        assert_eq!(v["rail"], "ALTERNATE");
        assert!(v["referenceHex"].as_str().unwrap().starts_with("0x4a4f42"));
    }
}
