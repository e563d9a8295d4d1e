use anyhow::Context;
use campweather_core::{
    Config, DailyForecast, ForecastAggregator, PlacesClient, ProviderId, WeekendForecast,
};
use clap::{Parser, Subcommand};
use serde_json::Value;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "campweather", version, about = "Campsite weekend weather")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store an API key for a provider in the config file.
    Configure {
        /// Provider short name: "accuweather" or "geoapify".
        provider: String,
    },

    /// Show the weekend forecast for a coordinate pair.
    Weekend {
        #[arg(allow_negative_numbers = true)]
        lat: f64,

        #[arg(allow_negative_numbers = true)]
        lon: f64,

        /// Print the raw JSON the HTTP API would return.
        #[arg(long)]
        json: bool,
    },

    /// Search campsites in Great Britain by name or place.
    Search {
        query: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Weekend { lat, lon, json } => {
                let config = Config::load()?;
                let aggregator = ForecastAggregator::from_config(&config)?;
                let forecast = aggregator.weekend_forecast(lat, lon).await?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&forecast)?);
                } else {
                    print!("{}", render_forecast(&forecast));
                }
                Ok(())
            }
            Command::Search { query } => {
                let config = Config::load()?;
                let places = PlacesClient::from_config(&config)?;
                let results = places.search_campsites(&query).await?;

                print!("{}", render_places(&results));
                Ok(())
            }
        }
    }
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load_file()?;

    let api_key = inquire::Password::new(&format!("{id} API key:"))
        .without_confirmation()
        .with_display_mode(inquire::PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;

    config.upsert_provider_api_key(id, api_key.trim().to_string());
    config.save()?;

    println!("Saved {id} credentials to {}", Config::config_file_path()?.display());
    Ok(())
}

fn render_forecast(forecast: &WeekendForecast) -> String {
    let mut out = String::new();

    let verdict = if forecast.good_weather { "yes" } else { "no" };
    out.push_str(&format!("Good weekend weather: {verdict}\n"));

    if forecast.daily.is_empty() {
        out.push_str("No forecast days returned.\n");
    }
    for (idx, day) in forecast.daily.iter().enumerate() {
        out.push_str(&format!("  {}\n", render_day(idx, day)));
    }

    match forecast.alerts.len() {
        0 => out.push_str("No active alerts.\n"),
        n => out.push_str(&format!("{n} active alert(s).\n")),
    }

    out
}

fn render_day(idx: usize, day: &DailyForecast) -> String {
    let label = day
        .date
        .map(|d| d.format("%a %d %b").to_string())
        .unwrap_or_else(|| format!("Day {}", idx + 1));

    let temp = match (day.temp.min, day.temp.day) {
        (Some(min), Some(max)) => format!("{min:.0} to {max:.0}°C"),
        (None, Some(max)) => format!("max {max:.0}°C"),
        _ => "temperature n/a".to_string(),
    };

    let wind = day.wind_kph.map(|w| format!(", wind {w:.0} km/h")).unwrap_or_default();

    format!("{label}: {temp}, rain {:.0}%{wind}", day.pop * 100.0)
}

/// One line per Geoapify feature; falls back to pretty JSON.
fn render_places(results: &Value) -> String {
    let Some(features) = results.get("features").and_then(Value::as_array) else {
        return serde_json::to_string_pretty(results).unwrap_or_default() + "\n";
    };

    if features.is_empty() {
        return "No campsites found.\n".to_string();
    }

    features
        .iter()
        .map(|feature| {
            let props = &feature["properties"];
            let name = props["name"].as_str().unwrap_or("(unnamed)");
            match props["formatted"].as_str() {
                Some(address) if address != name => format!("{name} - {address}\n"),
                _ => format!("{name}\n"),
            }
        })
        .collect()
}
