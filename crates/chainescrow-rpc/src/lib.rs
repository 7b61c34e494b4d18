//! chainescrow-rpc: the node-facing transport layer.
//!
//! - [`RpcTransport`]: object-safe async trait every transport implements
//! - [`JsonRpcRequest`] / [`JsonRpcResponse`]: JSON-RPC 2.0 wire types
//! - [`HttpTransport`]: `reqwest`-backed HTTP transport
//! - [`RetryTransport`]: opt-in exponential backoff wrapper
//!
//! Transports never retry on their own. Wrapping one in [`RetryTransport`]
//! is a caller decision.

pub mod error;
pub mod http;
pub mod request;
pub mod retry;
pub mod transport;

pub use error::TransportError;
pub use http::{HttpTransport, HttpTransportConfig};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use retry::{RetryConfig, RetryPolicy, RetryTransport};
pub use transport::{call, RpcTransport};
