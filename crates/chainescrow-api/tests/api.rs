//! Router-level tests for the read API.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::util::ServiceExt;

use chainescrow_api::{create_router, ApiConfig, AppState};
use chainescrow_core::{reference, AddressBook};
use chainescrow_evm::{EngineConfig, EvmRpcClient, LedgerSignature, LogFilter, MilestoneEngine, RawLog};
use chainescrow_rpc::TransportError;

const ESCROW: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

struct Node {
    logs: Vec<RawLog>,
    down: bool,
}

#[async_trait]
impl EvmRpcClient for Node {
    async fn block_number(&self) -> Result<u64, TransportError> {
        if self.down {
            return Err(TransportError::Http("connection refused".into()));
        }
        Ok(1_000)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, TransportError> {
        Ok(self
            .logs
            .iter()
            .filter(|l| filter.addresses.iter().any(|a| a.eq_ignore_ascii_case(&l.address)))
            .filter(|l| {
                let block = l.block_number_u64();
                block >= filter.from_block && block <= filter.to_block
            })
            .cloned()
            .collect())
    }

    async fn call(&self, _to: &str, _data: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        Ok(DynSolValue::Uint(U256::from(18), 8).abi_encode())
    }
}

fn word(v: u64) -> String {
    B256::from(U256::from(v).to_be_bytes::<32>()).to_string()
}

fn created(id: u64, client: Address, worker: Address, block: u64) -> RawLog {
    let data = DynSolValue::Tuple(vec![
        DynSolValue::Uint(U256::from(1000), 256),
        DynSolValue::FixedBytes(reference::encode(&format!("JOB-{id}")), 32),
        DynSolValue::Uint(U256::ZERO, 8),
    ])
    .abi_encode_params();
    RawLog {
        address: ESCROW.into(),
        topics: vec![
            LedgerSignature::MilestoneCreated.topic0().to_string(),
            word(id),
            client.into_word().to_string(),
            worker.into_word().to_string(),
        ],
        data: format!("0x{}", hex::encode(data)),
        block_number: format!("0x{block:x}"),
        block_hash: String::new(),
        tx_hash: format!("0x{:064x}", id),
        log_index: "0x0".into(),
        removed: None,
    }
}

fn app(down: bool, with_token: bool) -> Router {
    let mut env: HashMap<String, String> = [
        ("CHAINESCROW_ESCROW", ESCROW),
        ("CHAINESCROW_PRIMARY_RAIL", "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512"),
        ("CHAINESCROW_ALTERNATE_RAIL", "0x9fe46736679d2d9a65f0992f2272de9f3c7fa6e0"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    if with_token {
        env.insert(
            "CHAINESCROW_TOKEN".into(),
            "0xdc64a140aa3e981100a9beca4e685f962f0cf6c9".into(),
        );
    }
    let book = AddressBook::resolve(31337, None, &env).unwrap();
    let node = Node {
        logs: vec![
            created(1, Address::repeat_byte(0xa1), Address::repeat_byte(0xb2), 900),
            created(2, Address::repeat_byte(0xc3), Address::repeat_byte(0xd4), 950),
        ],
        down,
    };
    let engine = MilestoneEngine::new(Arc::new(node), book, EngineConfig::default());
    create_router(AppState::new(engine, ApiConfig::default()))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let cache = response
        .headers()
        .get(header::CACHE_CONTROL)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, cache, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_chain() {
    let (status, _, body) = get(app(false, false), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["chainId"], 31337);
}

#[tokio::test]
async fn milestones_full_variant() {
    let (status, cache, body) = get(app(false, false), "/api/milestones").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("public, max-age=30, stale-while-revalidate=30"));
    assert_eq!(body["milestones"][0]["id"], 2);
    assert_eq!(body["milestones"][1]["reference"], "JOB-1");
    assert_eq!(body["events"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn milestones_filtered_by_address() {
    let filter = Address::repeat_byte(0xd4).to_string().to_uppercase().replace("0X", "0x");
    let (status, _, body) = get(app(false, false), &format!("/api/milestones?address={filter}")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<u64> = body["milestones"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![2]);
}

#[tokio::test]
async fn list_variant_is_bare_array() {
    let (status, _, body) = get(app(false, false), "/api/milestones/list?fromBlock=920&toBlock=1000").await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["createdBlock"], "950");
}

#[tokio::test]
async fn recent_variant_has_events() {
    let (status, _, body) = get(app(false, false), "/api/milestones/recent").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"][0]["type"], "CREATED");
}

#[tokio::test]
async fn bad_block_number_is_400() {
    let (status, _, body) = get(app(false, false), "/api/milestones?fromBlock=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PARAMETER");
}

#[tokio::test]
async fn node_failure_is_502() {
    let (status, _, body) = get(app(true, false), "/api/milestones").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn missing_reputation_ledger_is_config_error() {
    let (status, _, body) = get(app(false, false), "/api/reputation").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "CONFIG_ERROR");
    assert!(body["error"].as_str().unwrap().contains("CHAINESCROW_REPUTATION"));
}

#[tokio::test]
async fn token_decimals() {
    let (status, _, body) = get(app(false, true), "/api/token/decimals").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["decimals"], 18);
}

#[tokio::test]
async fn open_escrows_requires_owner() {
    let (status, _, body) = get(app(false, false), "/api/escrows/open").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PARAMETER");
}

#[tokio::test]
async fn unknown_route_is_404_json() {
    let (status, _, body) = get(app(false, false), "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}
