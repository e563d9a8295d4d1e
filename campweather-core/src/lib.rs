//! Core library for the campweather backend.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weekend forecast aggregator and its AccuWeather source
//! - The upstream error taxonomy
//! - Geoapify places search and a thin Supabase client
//!
//! It is used by `campweather-server` and `campweather-cli`.

pub mod config;
pub mod error;
pub mod forecast;
pub mod model;
pub mod places;
pub mod provider;
pub mod supabase;

pub use config::{Config, ProviderConfig, ServerConfig, SupabaseConfig};
pub use error::{ForecastError, Operation, UpstreamError, UpstreamReason};
pub use forecast::{AlertFailurePolicy, ForecastAggregator};
pub use model::{Alert, Coordinates, DailyForecast, DayTemperature, LocationKey, WeekendForecast};
pub use places::PlacesClient;
pub use provider::{ForecastSource, ProviderId};
pub use supabase::{SupabaseClient, SupabaseError};
