use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use campweather_core::{ForecastError, SupabaseError};

/// Every error a handler can return. The body is always `{ "error": ... }`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    /// Places search or another upstream passthrough failed.
    #[error("Upstream request failed")]
    BadGateway(#[source] anyhow::Error),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    /// BaaS failures surface their message as a 400, like validation errors.
    pub fn baas(err: SupabaseError) -> Self {
        match err {
            SupabaseError::Api { message, .. } => ApiError::BadRequest(message),
            other => {
                error!(error = %other, "Supabase request failed");
                ApiError::Internal(other.to_string())
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingToken | ApiError::InvalidToken | ApiError::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Forecast(err) => err.http_status(),
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn log(&self) {
        match self {
            ApiError::Forecast(ForecastError::Upstream(err)) => warn!(
                reason = %err.reason,
                operation = %err.operation,
                upstream_status = ?err.upstream_status.map(|s| s.as_u16()),
                upstream_body = err.upstream_body.as_deref().unwrap_or(""),
                "Weather upstream failed",
            ),
            ApiError::Forecast(err @ ForecastError::MalformedResponse { .. }) => {
                warn!(error = %err, "Weather upstream returned a malformed response")
            }
            ApiError::BadGateway(err) => warn!(error = ?err, "Upstream passthrough failed"),
            ApiError::Internal(detail) => error!(detail = %detail, "Internal server error"),
            _ => {}
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
