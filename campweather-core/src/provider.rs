use crate::{
    Config,
    error::ForecastError,
    model::{Alert, Coordinates, DailyForecast, LocationKey},
    provider::accuweather::AccuWeatherClient,
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod accuweather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    AccuWeather,
    Geoapify,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::AccuWeather => "accuweather",
            ProviderId::Geoapify => "geoapify",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderId::AccuWeather => "ACCUWEATHER_API_KEY",
            ProviderId::Geoapify => "GEOAPIFY_KEY",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::AccuWeather, ProviderId::Geoapify]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "accuweather" => Ok(ProviderId::AccuWeather),
            "geoapify" => Ok(ProviderId::Geoapify),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: accuweather, geoapify."
            )),
        }
    }
}

/// The three upstream calls the weekend forecast is built from.
///
/// Implementations classify their own HTTP failures; callers decide which of
/// them are fatal.
#[async_trait]
pub trait ForecastSource: Send + Sync + Debug {
    async fn location_key(&self, coords: Coordinates) -> Result<LocationKey, ForecastError>;

    /// Daily entries in provider order.
    async fn five_day_forecast(&self, key: &LocationKey) -> Result<Vec<DailyForecast>, ForecastError>;

    async fn active_alerts(&self, key: &LocationKey) -> Result<Vec<Alert>, ForecastError>;
}

/// Construct the forecast source from config.
pub fn forecast_source_from_config(config: &Config) -> anyhow::Result<Arc<dyn ForecastSource>> {
    let id = ProviderId::AccuWeather;
    let api_key = config.require_provider_api_key(id)?;

    let client = match config.provider_base_url(id) {
        Some(base_url) => AccuWeatherClient::with_base_url(api_key.to_owned(), base_url),
        None => AccuWeatherClient::new(api_key.to_owned()),
    };

    Ok(Arc::new(client))
}
