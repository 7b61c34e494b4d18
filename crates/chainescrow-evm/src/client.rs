//! `EvmRpcClient` over any [`RpcTransport`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use chainescrow_rpc::{call, RpcTransport, TransportError};

use crate::fetcher::{EvmRpcClient, LogFilter, RawLog};

/// Issues `eth_blockNumber`, `eth_getLogs` and `eth_call` through a transport.
#[derive(Clone)]
pub struct RpcEvmClient {
    transport: Arc<dyn RpcTransport>,
}

impl RpcEvmClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    pub fn url(&self) -> &str {
        self.transport.url()
    }
}

/// JSON params for `eth_getLogs`. Topic0 values are OR-ed.
pub fn logs_params(filter: &LogFilter) -> Value {
    let topics: Vec<String> = filter.topics0.iter().map(|t| t.to_string()).collect();
    json!({
        "address": filter.addresses,
        "topics": [topics],
        "fromBlock": format!("0x{:x}", filter.from_block),
        "toBlock": format!("0x{:x}", filter.to_block),
    })
}

fn parse_quantity(s: &str) -> Result<u64, TransportError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|e| TransportError::Other(format!("invalid quantity '{s}': {e}")))
}

#[async_trait]
impl EvmRpcClient for RpcEvmClient {
    async fn block_number(&self) -> Result<u64, TransportError> {
        let head: String = call(self.transport.as_ref(), "eth_blockNumber", vec![]).await?;
        parse_quantity(&head)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, TransportError> {
        let logs: Vec<RawLog> =
            call(self.transport.as_ref(), "eth_getLogs", vec![logs_params(filter)]).await?;
        tracing::debug!(
            url = %self.transport.url(),
            from = filter.from_block,
            to = filter.to_block,
            count = logs.len(),
            "eth_getLogs"
        );
        Ok(logs)
    }

    async fn call(&self, to: &str, data: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let params = vec![
            json!({ "to": to, "data": format!("0x{}", hex::encode(data)) }),
            json!("latest"),
        ];
        let ret: String = call(self.transport.as_ref(), "eth_call", params).await?;
        let digits = ret.strip_prefix("0x").unwrap_or(&ret);
        hex::decode(digits).map_err(|e| TransportError::Other(format!("invalid eth_call return: {e}")))
    }
}
