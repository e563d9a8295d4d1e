//! Test-only hook for deleting users created by end-to-end tests.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::delete,
};
use serde::Deserialize;
use tracing::info;

use crate::{error::ApiError, state::AppState};

const SECRET_HEADER: &str = "x-test-secret";

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/cleanup-user", delete(cleanup_user))
}

#[derive(Debug, Default, Deserialize)]
pub struct CleanupRequest {
    pub user_id: Option<String>,
}

async fn cleanup_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<CleanupRequest>>,
) -> Result<StatusCode, ApiError> {
    if !state.config.server.allow_test_cleanup {
        return Err(ApiError::NotFound);
    }

    let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    let expected = state.config.server.test_secret.as_deref();
    if provided.is_none() || provided != expected {
        return Err(ApiError::Unauthorized("Unauthorized".into()));
    }

    let user_id = body
        .and_then(|Json(req)| req.user_id)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("user_id required".into()))?;

    state
        .supabase
        .delete_user(&user_id)
        .await
        .map_err(|err| ApiError::Internal(err.message()))?;

    info!(%user_id, "Deleted test user");
    Ok(StatusCode::NO_CONTENT)
}
