use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use campweather_core::Coordinates;

use crate::{auth::AuthUser, error::ApiError, state::AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/search", get(search))
        .route("/:id", get(fetch).put(update).delete(remove))
        .route("/:id/attractions", get(attractions))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewCampsite {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateCampsite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize)]
struct OwnedRow<'a, T> {
    #[serde(flatten)]
    row: &'a T,
    user_id: &'a str,
}

/// Coordinates of a stored campsite.
#[derive(Debug, Deserialize)]
pub(crate) struct CampsiteLocation {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".into()));
    }
    Ok(())
}

fn validate_coordinates(lat: f64, lon: f64) -> Result<(), ApiError> {
    Coordinates::new(lat, lon).map(|_| ()).map_err(|err| ApiError::BadRequest(err.to_string()))
}

impl NewCampsite {
    fn validate(&self) -> Result<(), ApiError> {
        validate_name(&self.name)?;
        validate_coordinates(self.lat, self.lon)
    }
}

impl UpdateCampsite {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        // Range-check each side on its own; the stored partner value is unknown here.
        validate_coordinates(self.lat.unwrap_or(0.0), self.lon.unwrap_or(0.0))
    }
}

async fn create(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    body: Result<Json<NewCampsite>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(campsite) = body.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    campsite.validate()?;

    let row = state
        .supabase
        .from("campsites")
        .bearer(&user.token)
        .insert(&OwnedRow { row: &campsite, user_id: &user.id })
        .await
        .map_err(ApiError::baas)?;

    Ok(Json(row))
}

async fn list(State(state): State<Arc<AppState>>, user: AuthUser) -> Result<Json<Value>, ApiError> {
    let rows = state
        .supabase
        .from("campsites")
        .select("*")
        .eq("user_id", &user.id)
        .bearer(&user.token)
        .fetch_all()
        .await
        .map_err(ApiError::baas)?;

    Ok(Json(rows))
}

async fn search(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let q = params.q.unwrap_or_default();
    if q.trim().is_empty() {
        return Err(ApiError::BadRequest("q is required".into()));
    }

    let results = state.places.search_campsites(&q).await.map_err(ApiError::BadGateway)?;
    Ok(Json(results))
}

async fn fetch(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let row = state
        .supabase
        .from("campsites")
        .select("*")
        .eq("id", &id)
        .eq("user_id", &user.id)
        .bearer(&user.token)
        .fetch_single()
        .await
        .map_err(|err| {
            debug!(%id, error = %err, "Campsite lookup failed");
            ApiError::NotFound
        })?;

    Ok(Json(row))
}

async fn update(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Result<Json<UpdateCampsite>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(patch) = body.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    patch.validate()?;

    let row = state
        .supabase
        .from("campsites")
        .eq("id", &id)
        .eq("user_id", &user.id)
        .bearer(&user.token)
        .update(&patch)
        .await
        .map_err(ApiError::baas)?;

    Ok(Json(row))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .supabase
        .from("campsites")
        .eq("id", &id)
        .eq("user_id", &user.id)
        .bearer(&user.token)
        .delete()
        .await
        .map_err(ApiError::baas)?;

    Ok(Json(json!({ "ok": true })))
}

async fn attractions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let location = campsite_location(&state, &user, &id).await?;
    let coords = Coordinates::new(location.lat, location.lon)?;

    let results = state.places.nearby_attractions(coords).await.map_err(ApiError::BadGateway)?;
    Ok(Json(results))
}

/// `lat,lon` of a campsite visible to `user`; any failure is a 404.
pub(crate) async fn campsite_location(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> Result<CampsiteLocation, ApiError> {
    let row = state
        .supabase
        .from("campsites")
        .select("lat,lon")
        .eq("id", id)
        .bearer(&user.token)
        .fetch_single()
        .await
        .map_err(|err| {
            debug!(%id, error = %err, "Campsite location lookup failed");
            ApiError::NotFound
        })?;

    serde_json::from_value(row).map_err(|err| {
        debug!(%id, error = %err, "Campsite row has no usable coordinates");
        ApiError::NotFound
    })
}
