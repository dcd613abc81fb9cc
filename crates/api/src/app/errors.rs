use axum::http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use arenagate_auth::AuthzError;
use arenagate_core::BridgeError;
use arenagate_infra::BackendError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("backend worker failed: {0}")]
    Worker(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Backend(BackendError::NotFound(msg)) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Backend(BackendError::Invalid(msg)) => json_error(StatusCode::BAD_REQUEST, "invalid", msg),
            ApiError::Backend(e @ BackendError::Unavailable(_)) => {
                tracing::warn!(error = %e, "backend unavailable");
                json_error(StatusCode::SERVICE_UNAVAILABLE, "backend_unavailable", "backend unavailable")
            }
            ApiError::Bridge(e) => {
                tracing::warn!(error = %e, "backend call failed");
                let (status, code) = match e {
                    BridgeError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "cancelled"),
                    BridgeError::TimedOut(_) => (StatusCode::GATEWAY_TIMEOUT, "backend_timeout"),
                    BridgeError::Abandoned => (StatusCode::BAD_GATEWAY, "backend_abandoned"),
                };
                json_error(status, code, e.to_string())
            }
            ApiError::Worker(msg) => {
                tracing::error!(error = %msg, "backend worker failed");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
            }
        }
    }
}

/// 401 with a Basic challenge. Missing credentials and missing permissions
/// look the same to the caller.
pub fn unauthorized(err: &AuthzError) -> Response {
    let mut response = json_error(StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized");
    response
        .headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static(err.challenge()));
    response
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
