//! Transport-level error types.

use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors that can occur while talking to a node.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, TLS failure, non-2xx status and the like.
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON-RPC error object returned by the node (e.g. range too large).
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// HTTP 429 or an equivalent provider signal.
    #[error("Rate limit exceeded ({url})")]
    RateLimited { url: String },

    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Timeout { .. } | Self::RateLimited { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_errors_are_not_retryable() {
        let err = TransportError::Rpc(JsonRpcError {
            code: -32005,
            message: "query returned more than 10000 results".into(),
            data: None,
        });
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("-32005"));
    }

    #[test]
    fn network_errors_are_retryable() {
        assert!(TransportError::Http("connection reset".into()).is_retryable());
        assert!(TransportError::Timeout { ms: 100 }.is_retryable());
    }
}
