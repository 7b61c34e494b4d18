//! API route handlers

use axum::{
    extract::{Query, State},
    http::{header, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use chainescrow_core::ViewError;
use chainescrow_evm::MilestoneQuery;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Milestone views
        .route("/api/milestones", get(milestones))
        .route("/api/milestones/recent", get(recent_milestones))
        .route("/api/milestones/list", get(list_milestones))
        // Auxiliary reads
        .route("/api/reputation", get(reputation))
        .route("/api/escrows/open", get(open_escrows))
        .route("/api/token/decimals", get(token_decimals))
        .fallback(not_found)
        .with_state(state)
}

/// `Cache-Control` value for a public, briefly cacheable response.
pub fn cache_control(max_age: u32) -> String {
    format!("public, max-age={max_age}, stale-while-revalidate=30")
}

/// Raw milestone query string. Block numbers arrive as strings so that bad
/// values surface as `INVALID_PARAMETER` rather than an extractor rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneParams {
    pub from_block: Option<String>,
    pub to_block: Option<String>,
    pub address: Option<String>,
}

impl MilestoneParams {
    pub fn into_query(self) -> Result<MilestoneQuery, ViewError> {
        Ok(MilestoneQuery {
            from_block: parse_block("fromBlock", self.from_block)?,
            to_block: parse_block("toBlock", self.to_block)?,
            address: self.address,
        })
    }
}

/// Decimal or `0x` hex block number. Blank means absent.
fn parse_block(name: &'static str, raw: Option<String>) -> Result<Option<u64>, ViewError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    };
    parsed.map(Some).map_err(|_| ViewError::InvalidParameter {
        name,
        reason: format!("'{value}' is not an unsigned block number"),
    })
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub chain_id: u64,
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        chain_id: state.engine.address_book().chain_id,
    })
}

async fn milestones(
    State(state): State<AppState>,
    Query(params): Query<MilestoneParams>,
) -> ApiResult<impl IntoResponse> {
    let view = state.engine.milestones(&params.into_query()?).await?;
    Ok(([(header::CACHE_CONTROL, cache_control(state.config.cache_max_age))], Json(view)))
}

async fn recent_milestones(
    State(state): State<AppState>,
    Query(params): Query<MilestoneParams>,
) -> ApiResult<impl IntoResponse> {
    let view = state.engine.recent(&params.into_query()?).await?;
    Ok(([(header::CACHE_CONTROL, cache_control(state.config.cache_max_age))], Json(view)))
}

async fn list_milestones(
    State(state): State<AppState>,
    Query(params): Query<MilestoneParams>,
) -> ApiResult<impl IntoResponse> {
    let list = state.engine.list(&params.into_query()?).await?;
    Ok(([(header::CACHE_CONTROL, cache_control(state.config.cache_max_age))], Json(list)))
}

async fn reputation(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let feed = state.engine.reputation().await?;
    Ok((
        [(header::CACHE_CONTROL, cache_control(state.config.reputation_cache_max_age))],
        Json(feed),
    ))
}

#[derive(Debug, Deserialize)]
pub struct OwnerParams {
    pub owner: Option<String>,
}

async fn open_escrows(
    State(state): State<AppState>,
    Query(params): Query<OwnerParams>,
) -> ApiResult<impl IntoResponse> {
    let owner = params
        .owner
        .filter(|o| !o.trim().is_empty())
        .ok_or(ViewError::InvalidParameter {
            name: "owner",
            reason: "required".to_string(),
        })?;
    let open = state.engine.open_escrows(&owner).await?;
    Ok(([(header::CACHE_CONTROL, cache_control(state.config.cache_max_age))], Json(open)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecimalsResponse {
    pub decimals: u8,
}

async fn token_decimals(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let decimals = state.engine.token_decimals().await?;
    Ok((
        [(header::CACHE_CONTROL, cache_control(state.config.cache_max_age))],
        Json(DecimalsResponse { decimals }),
    ))
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
