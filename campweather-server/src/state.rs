use std::sync::Arc;

use campweather_core::{Config, ForecastAggregator, PlacesClient, SupabaseClient};

use crate::auth::JwtVerifier;

/// Shared, read-only per-process state.
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    pub forecasts: ForecastAggregator,
    pub places: PlacesClient,
    pub supabase: SupabaseClient,
    pub jwt: JwtVerifier,
}

impl AppState {
    /// Fails with a hint naming the first missing setting.
    pub fn from_config(config: Config) -> anyhow::Result<Arc<Self>> {
        let forecasts = ForecastAggregator::from_config(&config)?;
        let places = PlacesClient::from_config(&config)?;
        let supabase = SupabaseClient::from_config(&config)?;
        let jwt = JwtVerifier::new(config.require_jwt_secret()?);

        Ok(Arc::new(Self { config, forecasts, places, supabase, jwt }))
    }
}
