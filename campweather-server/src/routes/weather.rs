use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;

use campweather_core::WeekendForecast;

use crate::{auth::AuthUser, error::ApiError, routes::campsites::campsite_location, state::AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(by_coordinates)).route("/:campsite_id", get(by_campsite))
}

/// Kept as strings so bad input gets our own validation message.
#[derive(Debug, Deserialize)]
pub struct CoordinateParams {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

impl CoordinateParams {
    fn parse(&self) -> Result<(f64, f64), ApiError> {
        let parse = |value: &Option<String>| value.as_deref().and_then(|v| v.trim().parse::<f64>().ok());

        match (parse(&self.lat), parse(&self.lon)) {
            (Some(lat), Some(lon)) => Ok((lat, lon)),
            _ => Err(ApiError::BadRequest(format!(
                "Invalid coordinates: lat={}, lon={}",
                self.lat.as_deref().unwrap_or(""),
                self.lon.as_deref().unwrap_or(""),
            ))),
        }
    }
}

async fn by_coordinates(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(params): Query<CoordinateParams>,
) -> Result<Json<WeekendForecast>, ApiError> {
    let (lat, lon) = params.parse()?;
    let forecast = state.forecasts.weekend_forecast(lat, lon).await?;
    Ok(Json(forecast))
}

async fn by_campsite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(campsite_id): Path<String>,
) -> Result<Json<WeekendForecast>, ApiError> {
    let location = campsite_location(&state, &user, &campsite_id).await?;
    let forecast = state.forecasts.weekend_forecast(location.lat, location.lon).await?;
    Ok(Json(forecast))
}
