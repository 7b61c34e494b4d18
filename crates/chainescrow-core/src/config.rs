//! Contract address book.
//!
//! Resolution is a pure function of the chain id, an optional local address
//! file and a snapshot of the environment. Nothing is cached process-wide:
//! callers resolve once and pass the book into the engine.

use std::collections::HashMap;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_ESCROW: &str = "CHAINESCROW_ESCROW";
pub const ENV_PRIMARY_RAIL: &str = "CHAINESCROW_PRIMARY_RAIL";
pub const ENV_ALTERNATE_RAIL: &str = "CHAINESCROW_ALTERNATE_RAIL";
pub const ENV_REPUTATION: &str = "CHAINESCROW_REPUTATION";
pub const ENV_TOKEN: &str = "CHAINESCROW_TOKEN";

/// Every environment key the address book reads.
pub const ADDRESS_ENV_KEYS: [&str; 5] = [
    ENV_ESCROW,
    ENV_PRIMARY_RAIL,
    ENV_ALTERNATE_RAIL,
    ENV_REPUTATION,
    ENV_TOKEN,
];

/// One entry of a local address file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddressEntry {
    #[serde(default)]
    pub escrow: Option<String>,
    #[serde(default)]
    pub primary_rail: Option<String>,
    #[serde(default)]
    pub alternate_rail: Option<String>,
    #[serde(default)]
    pub reputation: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// A local address file: either one flat entry, or entries keyed by chain id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalAddresses {
    Flat(AddressEntry),
    ByChain(HashMap<String, AddressEntry>),
}

impl LocalAddresses {
    /// Parse the JSON contents of an address file.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::LocalFile(e.to_string()))
    }

    /// The entry that applies to `chain_id`, if any.
    pub fn entry_for(&self, chain_id: u64) -> Option<&AddressEntry> {
        match self {
            Self::Flat(entry) => Some(entry),
            Self::ByChain(map) => map.get(&chain_id.to_string()),
        }
    }
}

/// A payment-rail ledger whose `RailSettled` events are correlated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RailLedger {
    pub name: String,
    pub address: String,
}

/// Resolved, validated contract addresses for one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBook {
    pub chain_id: u64,
    /// Settlement ledger (milestone lifecycle events).
    pub escrow: String,
    pub rails: Vec<RailLedger>,
    pub reputation: Option<String>,
    pub token: Option<String>,
}

impl AddressBook {
    /// Resolve the book for `chain_id`. Local file values win over `env`.
    pub fn resolve(
        chain_id: u64,
        local: Option<&LocalAddresses>,
        env: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        if chain_id == 0 {
            return Err(ConfigError::InvalidChainId(chain_id));
        }
        let entry = local
            .and_then(|l| l.entry_for(chain_id))
            .cloned()
            .unwrap_or_default();

        let pick = |from_file: Option<String>, env_key: &'static str| {
            from_file
                .or_else(|| env.get(env_key).cloned())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let escrow = require("escrow", ENV_ESCROW, pick(entry.escrow, ENV_ESCROW))?;
        let primary = require(
            "primaryRail",
            ENV_PRIMARY_RAIL,
            pick(entry.primary_rail, ENV_PRIMARY_RAIL),
        )?;
        let alternate = require(
            "alternateRail",
            ENV_ALTERNATE_RAIL,
            pick(entry.alternate_rail, ENV_ALTERNATE_RAIL),
        )?;
        let reputation = pick(entry.reputation, ENV_REPUTATION)
            .map(|v| checksum("reputation", &v))
            .transpose()?;
        let token = pick(entry.token, ENV_TOKEN)
            .map(|v| checksum("token", &v))
            .transpose()?;

        Ok(Self {
            chain_id,
            escrow,
            rails: vec![
                RailLedger {
                    name: "primary".into(),
                    address: primary,
                },
                RailLedger {
                    name: "alternate".into(),
                    address: alternate,
                },
            ],
            reputation,
            token,
        })
    }

    /// Reputation ledger address, or a config error if it was never set.
    pub fn require_reputation(&self) -> Result<&str, ConfigError> {
        self.reputation.as_deref().ok_or(ConfigError::MissingAddress {
            key: "reputation",
            env: ENV_REPUTATION,
        })
    }

    /// Payment token address, or a config error if it was never set.
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.token.as_deref().ok_or(ConfigError::MissingAddress {
            key: "token",
            env: ENV_TOKEN,
        })
    }

    pub fn rail_addresses(&self) -> impl Iterator<Item = &str> {
        self.rails.iter().map(|r| r.address.as_str())
    }
}

fn require(
    key: &'static str,
    env: &'static str,
    value: Option<String>,
) -> Result<String, ConfigError> {
    let value = value.ok_or(ConfigError::MissingAddress { key, env })?;
    checksum(key, &value)
}

/// Validate a 0x-prefixed 20-byte hex address and return its EIP-55 form.
pub fn checksum(key: &'static str, value: &str) -> Result<String, ConfigError> {
    if !value.starts_with("0x") || value.len() != 42 {
        return Err(ConfigError::InvalidAddress {
            key,
            value: value.to_string(),
        });
    }
    value
        .parse::<Address>()
        .map(|a| a.to_checksum(None))
        .map_err(|_| ConfigError::InvalidAddress {
            key,
            value: value.to_string(),
        })
}
