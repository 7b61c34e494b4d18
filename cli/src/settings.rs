//! Startup configuration: address book, transport and engine wiring.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use chainescrow_core::{AddressBook, ConfigError, LocalAddresses};
use chainescrow_evm::{EngineConfig, MilestoneEngine, RpcEvmClient};
use chainescrow_rpc::{HttpTransport, HttpTransportConfig, RetryConfig, RetryTransport, RpcTransport};

/// Connection and engine settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct NodeSettings {
    pub rpc_url: String,
    pub chain_id: u64,
    pub addresses: Option<String>,
    pub retries: u32,
    pub request_timeout_ms: u64,
    pub engine: EngineConfig,
}

/// Parse the local address file, if one was given.
pub fn load_local(path: Option<&Path>) -> Result<Option<LocalAddresses>, ConfigError> {
    let Some(path) = path else {
        return Ok(None);
    };
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::LocalFile(format!("{}: {e}", path.display())))?;
    LocalAddresses::from_json(&raw).map(Some)
}

/// Resolve the address book from the local file and an env snapshot.
pub fn address_book(settings: &NodeSettings, env: &HashMap<String, String>) -> Result<AddressBook> {
    let local = load_local(settings.addresses.as_deref().map(Path::new))?;
    let book = AddressBook::resolve(settings.chain_id, local.as_ref(), env)
        .with_context(|| format!("resolving contract addresses for chain {}", settings.chain_id))?;
    tracing::debug!(
        chain_id = book.chain_id,
        escrow = %book.escrow,
        rails = book.rails.len(),
        reputation = book.reputation.is_some(),
        token = book.token.is_some(),
        "address book resolved"
    );
    Ok(book)
}

/// HTTP transport, wrapped in retries when `--retries` is non-zero.
pub fn transport(settings: &NodeSettings) -> Result<Arc<dyn RpcTransport>> {
    let http = HttpTransport::new(
        settings.rpc_url.clone(),
        HttpTransportConfig {
            request_timeout: Duration::from_millis(settings.request_timeout_ms),
        },
    )
    .context("building RPC transport")?;

    if settings.retries == 0 {
        return Ok(Arc::new(http));
    }
    Ok(Arc::new(RetryTransport::new(
        http,
        RetryConfig {
            max_retries: settings.retries,
            ..RetryConfig::default()
        },
    )))
}

/// Resolve everything and build the engine. Fails before any network call
/// when configuration is incomplete.
pub fn engine(settings: &NodeSettings, env: &HashMap<String, String>) -> Result<MilestoneEngine> {
    let book = address_book(settings, env)?;
    let client = RpcEvmClient::new(transport(settings)?);
    Ok(MilestoneEngine::new(Arc::new(client), book, settings.engine.clone()))
}
