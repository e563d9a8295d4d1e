use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{auth::AuthUser, error::ApiError, state::AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list))
        .route("/alerts/subscribe", post(subscribe))
        .route("/:campsite_id", post(add).delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub campsite_id: String,
    #[serde(default = "default_alert_type")]
    pub alert_type: String,
}

fn default_alert_type() -> String {
    "weather".to_string()
}

#[derive(Debug, Serialize)]
struct AlertSubscription<'a> {
    campsite_id: Uuid,
    alert_type: &'a str,
    user_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Favourite<'a> {
    user_id: &'a str,
    campsite_id: &'a str,
}

async fn list(State(state): State<Arc<AppState>>, user: AuthUser) -> Result<Json<Value>, ApiError> {
    let rows = state
        .supabase
        .from("favourites")
        .select("id,campsite_id,campsites(name,lat,lon)")
        .eq("user_id", &user.id)
        .bearer(&user.token)
        .fetch_all()
        .await
        .map_err(ApiError::baas)?;

    Ok(Json(rows))
}

async fn add(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(campsite_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let row = state
        .supabase
        .from("favourites")
        .bearer(&user.token)
        .insert(&Favourite { user_id: &user.id, campsite_id: &campsite_id })
        .await
        .map_err(ApiError::baas)?;

    Ok(Json(row))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(campsite_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .supabase
        .from("favourites")
        .eq("user_id", &user.id)
        .eq("campsite_id", &campsite_id)
        .bearer(&user.token)
        .delete()
        .await
        .map_err(ApiError::baas)?;

    Ok(Json(json!({ "ok": true })))
}

async fn subscribe(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    body: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = body.map_err(|err| ApiError::BadRequest(err.body_text()))?;

    let campsite_id = Uuid::parse_str(req.campsite_id.trim())
        .map_err(|_| ApiError::BadRequest("campsite_id must be a UUID".into()))?;

    let row = state
        .supabase
        .from("alerts")
        .bearer(&user.token)
        .insert(&AlertSubscription { campsite_id, alert_type: &req.alert_type, user_id: &user.id })
        .await
        .map_err(ApiError::baas)?;

    Ok(Json(row))
}
