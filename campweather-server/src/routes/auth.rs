use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::{error::ApiError, state::AppState};

const MIN_PASSWORD_LEN: usize = 6;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/register", post(register)).route("/login", post(login))
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Trimmed, lower-cased, and shaped like `local@domain.tld`.
    fn normalized_email(&self) -> Result<String, ApiError> {
        let email = self.email.trim().to_lowercase();

        let valid = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.split('.').count() >= 2
                    && domain.split('.').all(|part| !part.is_empty())
                    && !email.contains(char::is_whitespace)
            }
            None => false,
        };

        if valid { Ok(email) } else { Err(ApiError::BadRequest("Invalid email".into())) }
    }
}

async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(creds) = body.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    let email = creds.normalized_email()?;

    if creds.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let data = state.supabase.sign_up(&email, &creds.password).await.map_err(ApiError::baas)?;
    info!("Registered new user");
    Ok(Json(data))
}

async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(creds) = body.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    let email = creds.normalized_email()?;

    let session = state
        .supabase
        .sign_in_with_password(&email, &creds.password)
        .await
        .map_err(|err| ApiError::Unauthorized(err.message()))?;

    Ok(Json(session))
}
