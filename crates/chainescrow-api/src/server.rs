//! API Server setup

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use chainescrow_evm::MilestoneEngine;

use crate::routes::create_router;
use crate::state::{ApiConfig, AppState};

/// Router with tracing and, when enabled, permissive CORS.
pub fn build_app(state: AppState) -> Router {
    let enable_cors = state.config.enable_cors;
    let mut router = create_router(state).layer(TraceLayer::new_for_http());

    if enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }
    router
}

/// Run the API server until Ctrl-C.
pub async fn run_server(
    config: ApiConfig,
    engine: MilestoneEngine,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let app = build_app(AppState::new(engine, config));

    tracing::info!(addr = %listener.local_addr()?, "chainescrow API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("chainescrow API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
