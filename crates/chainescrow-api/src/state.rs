//! Application state for the API server

use std::sync::Arc;

use chainescrow_evm::MilestoneEngine;

/// API server state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MilestoneEngine>,
    pub config: Arc<ApiConfig>,
    /// API version
    pub version: String,
}

impl AppState {
    pub fn new(engine: MilestoneEngine, config: ApiConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            config: Arc::new(config),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    /// `max-age` for milestone responses, in seconds.
    pub cache_max_age: u32,
    /// `max-age` for the reputation feed, in seconds.
    pub reputation_cache_max_age: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            cache_max_age: 30,
            reputation_cache_max_age: 15,
        }
    }
}
