use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Opaque upstream alert record, passed through unchanged.
pub type Alert = serde_json::Value;

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Both values must be finite and within the usual geographic ranges.
    pub fn new(lat: f64, lon: f64) -> Result<Self, ForecastError> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);

        if !valid {
            return Err(ForecastError::InvalidCoordinates { lat, lon });
        }

        Ok(Self { lat, lon })
    }

    /// `"lat,lon"`, the form the geoposition search expects.
    pub fn to_query(&self) -> String {
        format!("{},{}", self.lat, self.lon)
    }
}

/// AccuWeather's identifier for a resolved location. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationKey(String);

impl LocationKey {
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.trim().is_empty() { None } else { Some(Self(key)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayTemperature {
    /// Daily maximum in °C; `None` when the provider omitted it.
    pub day: Option<f64>,
    #[serde(skip)]
    pub min: Option<f64>,
}

/// One day of the forecast.
///
/// Only `temp.day` and `pop` go over the wire; the remaining fields feed the
/// good-weather rule and human-readable output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    #[serde(skip)]
    pub date: Option<DateTime<FixedOffset>>,
    pub temp: DayTemperature,
    /// Precipitation probability as a fraction in `0.0..=1.0`.
    pub pop: f64,
    #[serde(skip)]
    pub wind_kph: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekendForecast {
    pub good_weather: bool,
    pub alerts: Vec<Alert>,
    pub daily: Vec<DailyForecast>,
}
