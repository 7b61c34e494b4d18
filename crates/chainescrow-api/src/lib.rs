//! ChainEscrow read API.
//!
//! ## Endpoints
//!
//! - GET /health - Liveness and configured chain
//! - GET /api/milestones - Milestones and their full visible history
//! - GET /api/milestones/recent - Same, history capped to the newest events
//! - GET /api/milestones/list - Bare milestone list
//! - GET /api/reputation - Newest reputation proofs
//! - GET /api/escrows/open?owner= - Open escrows read from the settlement ledger
//! - GET /api/token/decimals - Payment token decimals
//!
//! Milestone endpoints accept `fromBlock`, `toBlock` and `address`.

pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use server::{build_app, run_server};
pub use state::{ApiConfig, AppState};
