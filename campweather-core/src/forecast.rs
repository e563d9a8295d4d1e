//! Weekend forecast aggregation.
//!
//! Resolves a location key, fetches the 5-day forecast and active alerts in
//! parallel, and reduces the first three days to a single "good weather" flag.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    Config,
    error::ForecastError,
    model::{Coordinates, DailyForecast, WeekendForecast},
    provider::{ForecastSource, forecast_source_from_config},
};

/// Minimum daily maximum temperature, °C.
pub const GOOD_TEMP_C: f64 = 15.0;
/// Maximum precipitation probability, as a fraction.
pub const MAX_RAIN_PROBABILITY: f64 = 0.30;
/// Maximum wind speed, km/h. Days without a reading pass.
pub const MAX_WIND_KPH: f64 = 35.0;
/// The "weekend" is the first this-many daily entries, not a calendar match.
pub const WEEKEND_WINDOW_DAYS: usize = 3;

/// What to do when the active-alerts call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertFailurePolicy {
    /// Log a warning and return an empty alert list.
    #[default]
    Degrade,
    /// Fail the whole forecast like any other upstream error.
    Propagate,
}

impl AlertFailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertFailurePolicy::Degrade => "degrade",
            AlertFailurePolicy::Propagate => "propagate",
        }
    }
}

impl fmt::Display for AlertFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AlertFailurePolicy {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "degrade" => Ok(AlertFailurePolicy::Degrade),
            "propagate" => Ok(AlertFailurePolicy::Propagate),
            _ => Err(anyhow::anyhow!(
                "Unknown alert failure policy '{value}'. Expected 'degrade' or 'propagate'."
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForecastAggregator {
    source: Arc<dyn ForecastSource>,
    alert_policy: AlertFailurePolicy,
}

impl ForecastAggregator {
    pub fn new(source: Arc<dyn ForecastSource>) -> Self {
        Self { source, alert_policy: AlertFailurePolicy::default() }
    }

    pub fn with_alert_policy(mut self, policy: AlertFailurePolicy) -> Self {
        self.alert_policy = policy;
        self
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let source = forecast_source_from_config(config)?;
        Ok(Self::new(source).with_alert_policy(config.alert_failure_policy))
    }

    pub fn alert_policy(&self) -> AlertFailurePolicy {
        self.alert_policy
    }

    /// Forecast for the weekend window at `(lat, lon)`.
    ///
    /// Invalid coordinates fail before any upstream call. Location and
    /// forecast failures are always fatal; alert failures follow the
    /// configured [`AlertFailurePolicy`]. Nothing is retried.
    pub async fn weekend_forecast(&self, lat: f64, lon: f64) -> Result<WeekendForecast, ForecastError> {
        let coords = Coordinates::new(lat, lon)?;

        let key = self.source.location_key(coords).await?;
        debug!(%key, lat, lon, "Resolved AccuWeather location key");

        let (forecast, alerts) = tokio::join!(
            self.source.five_day_forecast(&key),
            self.source.active_alerts(&key),
        );

        let mut daily = forecast?;
        let alerts = match (alerts, self.alert_policy) {
            (Ok(alerts), _) => alerts,
            (Err(err), AlertFailurePolicy::Propagate) => return Err(err),
            (Err(err), AlertFailurePolicy::Degrade) => {
                warn!(%key, error = %err, "Active alerts unavailable; continuing without alerts");
                Vec::new()
            }
        };

        daily.truncate(WEEKEND_WINDOW_DAYS);

        Ok(WeekendForecast { good_weather: is_good_weather(&daily), alerts, daily })
    }
}

/// True only for a non-empty window where every day passes [`is_good_day`].
pub fn is_good_weather(window: &[DailyForecast]) -> bool {
    !window.is_empty() && window.iter().all(is_good_day)
}

pub fn is_good_day(day: &DailyForecast) -> bool {
    let warm = day.temp.day.is_some_and(|t| t.is_finite() && t >= GOOD_TEMP_C);
    let dry = day.pop <= MAX_RAIN_PROBABILITY;
    let calm = day.wind_kph.is_none_or(|w| w <= MAX_WIND_KPH);

    warm && dry && calm
}
