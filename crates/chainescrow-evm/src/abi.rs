//! Ledger ABI: canonical event signatures, topic0 hashes and call selectors.
//!
//! topic0 of an EVM log is the keccak256 hash of the event's canonical
//! signature, e.g.
//!   keccak256("Transfer(address,address,uint256)")
//!   → 0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef

use alloy_dyn_abi::DynSolType;
use alloy_primitives::B256;
use tiny_keccak::{Hasher, Keccak};

/// `getOpenEscrows(address)` on the settlement ledger.
pub const GET_OPEN_ESCROWS: &str = "getOpenEscrows(address)";
/// ERC-20 `decimals()`.
pub const DECIMALS: &str = "decimals()";

/// keccak256 of arbitrary bytes.
pub fn keccak256(bytes: &[u8]) -> B256 {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(bytes);
    hasher.finalize(&mut output);
    B256::from(output)
}

/// topic0 for a canonical event signature.
pub fn topic0(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

/// 4-byte function selector for a canonical function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Shape of a non-indexed (data) argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataArg {
    Uint256,
    Uint8,
    Bytes32,
    Bool,
    Bytes,
}

impl DataArg {
    pub fn sol_type(self) -> DynSolType {
        match self {
            Self::Uint256 => DynSolType::Uint(256),
            Self::Uint8 => DynSolType::Uint(8),
            Self::Bytes32 => DynSolType::FixedBytes(32),
            Self::Bool => DynSolType::Bool,
            Self::Bytes => DynSolType::Bytes,
        }
    }
}

/// Every event the read model decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerSignature {
    MilestoneCreated,
    Funded,
    Released,
    Canceled,
    RailSettled,
    ReputationMinted,
}

impl LedgerSignature {
    pub const ALL: [Self; 6] = [
        Self::MilestoneCreated,
        Self::Funded,
        Self::Released,
        Self::Canceled,
        Self::RailSettled,
        Self::ReputationMinted,
    ];

    /// Events emitted by the settlement ledger.
    pub const SETTLEMENT: [Self; 4] = [
        Self::MilestoneCreated,
        Self::Funded,
        Self::Released,
        Self::Canceled,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::MilestoneCreated => "MilestoneCreated",
            Self::Funded => "Funded",
            Self::Released => "Released",
            Self::Canceled => "Canceled",
            Self::RailSettled => "RailSettled",
            Self::ReputationMinted => "ReputationMinted",
        }
    }

    /// Canonical signature used for topic0.
    pub fn signature(self) -> &'static str {
        match self {
            Self::MilestoneCreated => {
                "MilestoneCreated(uint256,address,address,uint256,bytes32,uint8)"
            }
            Self::Funded => "Funded(uint256,address,uint256)",
            Self::Released => "Released(uint256,address,uint256,uint8)",
            Self::Canceled => "Canceled(uint256)",
            Self::RailSettled => "RailSettled(address,address,address,uint256,bytes32,bytes)",
            Self::ReputationMinted => {
                "ReputationMinted(uint256,address,address,uint256,bytes32,bool)"
            }
        }
    }

    pub fn topic0(self) -> B256 {
        topic0(self.signature())
    }

    /// Number of indexed arguments (topics after topic0).
    pub fn indexed_count(self) -> usize {
        match self {
            Self::MilestoneCreated | Self::RailSettled | Self::ReputationMinted => 3,
            Self::Funded | Self::Released => 2,
            Self::Canceled => 1,
        }
    }

    /// Non-indexed arguments, in data order.
    pub fn data_args(self) -> &'static [DataArg] {
        match self {
            Self::MilestoneCreated => &[DataArg::Uint256, DataArg::Bytes32, DataArg::Uint8],
            Self::Funded => &[DataArg::Uint256],
            Self::Released => &[DataArg::Uint256, DataArg::Uint8],
            Self::Canceled => &[],
            Self::RailSettled => &[DataArg::Uint256, DataArg::Bytes32, DataArg::Bytes],
            Self::ReputationMinted => &[DataArg::Uint256, DataArg::Bytes32, DataArg::Bool],
        }
    }

    /// The tuple type of the data payload.
    pub fn data_type(self) -> DynSolType {
        DynSolType::Tuple(self.data_args().iter().map(|a| a.sol_type()).collect())
    }
}

/// topic0 values for a set of signatures.
pub fn topics_for(signatures: &[LedgerSignature]) -> Vec<B256> {
    signatures.iter().map(|s| s.topic0()).collect()
}
