//! Error types for the milestone read model.

use thiserror::Error;

/// Errors raised while resolving contract addresses and connection settings.
///
/// These are always surfaced before any network call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing address for {key}. Set {env} or add it to the local address file")]
    MissingAddress { key: &'static str, env: &'static str },

    #[error("Invalid address for {key}: '{value}' is not a 0x-prefixed 20-byte hex address")]
    InvalidAddress { key: &'static str, value: String },

    #[error("Chain id must be a positive integer, got {0}")]
    InvalidChainId(u64),

    #[error("Local address file: {0}")]
    LocalFile(String),

    #[error("{0}")]
    Other(String),
}

/// Errors that abort a milestone query.
///
/// Decoding anomalies never appear here. They degrade to placeholder
/// values and never fail a query.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Deadline of {ms}ms exceeded while fetching logs")]
    DeadlineExceeded { ms: u64 },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl ViewError {
    /// Returns `true` if the failure came from the node or the network.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Rpc(_) | Self::DeadlineExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_into_view_error() {
        let err: ViewError = ConfigError::InvalidChainId(0).into();
        assert!(matches!(err, ViewError::Config(_)));
        assert!(!err.is_upstream());
    }

    #[test]
    fn upstream_classification() {
        assert!(ViewError::Rpc("connection refused".into()).is_upstream());
        assert!(ViewError::DeadlineExceeded { ms: 500 }.is_upstream());
    }
}
