//! API Error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use chainescrow_core::ViewError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    View(#[from] ViewError),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::View(ViewError::Config(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR")
            }
            ApiError::View(ViewError::Rpc(_)) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            ApiError::View(ViewError::DeadlineExceeded { .. }) => {
                (StatusCode::GATEWAY_TIMEOUT, "DEADLINE_EXCEEDED")
            }
            ApiError::View(ViewError::InvalidParameter { .. }) => {
                (StatusCode::BAD_REQUEST, "INVALID_PARAMETER")
            }
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chainescrow_core::ConfigError;

    #[test]
    fn view_errors_map_to_statuses() {
        let cases = [
            (ApiError::from(ViewError::Config(ConfigError::InvalidChainId(0))), 500),
            (ApiError::from(ViewError::Rpc("down".into())), 502),
            (ApiError::from(ViewError::DeadlineExceeded { ms: 10 }), 504),
            (
                ApiError::from(ViewError::InvalidParameter { name: "toBlock", reason: "x".into() }),
                400,
            ),
            (ApiError::NotFound("/nope".into()), 404),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_and_code().0.as_u16(), status, "{err}");
        }
    }
}
