//! The `RpcTransport` trait.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// The async trait every node transport implements.
///
/// Object-safe, so it can be shared as `Arc<dyn RpcTransport>` across Tokio
/// tasks.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send a single JSON-RPC request and return the raw response.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// The transport's identifier (URL or name), used in logs.
    fn url(&self) -> &str;
}

/// Call `method` and deserialize the result.
pub async fn call<T: DeserializeOwned>(
    transport: &dyn RpcTransport,
    method: &str,
    params: Vec<Value>,
) -> Result<T, TransportError> {
    let resp = transport.send(JsonRpcRequest::new(1, method, params)).await?;
    let result = resp.into_result().map_err(TransportError::Rpc)?;
    serde_json::from_value(result).map_err(TransportError::Deserialization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::JsonRpcError;
    use serde_json::json;

    struct Fixed(Result<Value, JsonRpcError>);

    #[async_trait]
    impl RpcTransport for Fixed {
        async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
            Ok(match &self.0 {
                Ok(v) => JsonRpcResponse::success(req.id, v.clone()),
                Err(e) => JsonRpcResponse::failure(req.id, e.clone()),
            })
        }

        fn url(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn call_deserializes_result() {
        let t = Fixed(Ok(json!("0x10")));
        let head: String = call(&t, "eth_blockNumber", vec![]).await.unwrap();
        assert_eq!(head, "0x10");
    }

    #[tokio::test]
    async fn call_surfaces_node_error() {
        let t = Fixed(Err(JsonRpcError {
            code: -32602,
            message: "invalid params".into(),
            data: None,
        }));
        let err = call::<String>(&t, "eth_getLogs", vec![]).await.unwrap_err();
        assert!(matches!(err, TransportError::Rpc(e) if e.code == -32602));
    }
}
