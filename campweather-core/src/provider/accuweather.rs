use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    error::{ForecastError, Operation, UpstreamError},
    model::{Alert, Coordinates, DailyForecast, DayTemperature, LocationKey},
};

use super::ForecastSource;

const DEFAULT_BASE_URL: &str = "https://dataservice.accuweather.com";

#[derive(Debug, Clone)]
pub struct AccuWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl AccuWeatherClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// GET `path` and return the body of a 2xx response.
    async fn fetch(
        &self,
        operation: Operation,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<String, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);

        let res = self
            .http
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|err| {
                debug!(%operation, error = %err, "AccuWeather request failed to send");
                UpstreamError::transport(operation)
            })?;

        let status = res.status();

        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(UpstreamError::from_response(operation, status, truncate_body(&body)));
        }

        res.text().await.map_err(|err| {
            debug!(%operation, error = %err, "Failed to read AccuWeather response body");
            UpstreamError::transport(operation)
        })
    }
}

#[derive(Debug, Deserialize)]
struct AccuLocation {
    #[serde(rename = "Key", default)]
    key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AccuValue {
    #[serde(rename = "Value", default)]
    value: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct AccuTemperature {
    minimum: Option<AccuValue>,
    maximum: Option<AccuValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct AccuWind {
    speed: Option<AccuValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct AccuDayPart {
    /// 0..=100
    precipitation_probability: Option<f64>,
    /// km/h when `metric=true`.
    wind: Option<AccuWind>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct AccuDailyForecast {
    date: Option<String>,
    temperature: Option<AccuTemperature>,
    day: Option<AccuDayPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct AccuFiveDay {
    daily_forecasts: Vec<AccuDailyForecast>,
}

impl From<AccuDailyForecast> for DailyForecast {
    fn from(entry: AccuDailyForecast) -> Self {
        let temperature = entry.temperature.unwrap_or_default();
        let day = entry.day.unwrap_or_default();

        DailyForecast {
            date: entry
                .date
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok()),
            temp: DayTemperature {
                day: temperature.maximum.and_then(|v| v.value),
                min: temperature.minimum.and_then(|v| v.value),
            },
            pop: day.precipitation_probability.unwrap_or(0.0) / 100.0,
            wind_kph: day.wind.and_then(|w| w.speed).and_then(|s| s.value),
        }
    }
}

/// Parse a 5-day forecast body. Anything unreadable counts as no days.
fn parse_five_day(body: &str) -> Vec<DailyForecast> {
    match serde_json::from_str::<Option<AccuFiveDay>>(body) {
        Ok(parsed) => parsed
            .unwrap_or_default()
            .daily_forecasts
            .into_iter()
            .map(DailyForecast::from)
            .collect(),
        Err(err) => {
            warn!(error = %err, "AccuWeather 5 day forecast body was malformed; treating as empty");
            Vec::new()
        }
    }
}

/// Alerts pass through only when the body is a JSON array.
fn parse_alerts(body: &str) -> Vec<Alert> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Array(alerts)) => alerts,
        Ok(_) | Err(_) => Vec::new(),
    }
}

#[async_trait]
impl ForecastSource for AccuWeatherClient {
    async fn location_key(&self, coords: Coordinates) -> Result<LocationKey, ForecastError> {
        let operation = Operation::LocationSearch;
        let q = coords.to_query();

        let body = self
            .fetch(operation, "/locations/v1/cities/geoposition/search", &[("q", q.as_str())])
            .await?;

        let parsed: Option<AccuLocation> = serde_json::from_str(&body).map_err(|err| {
            ForecastError::malformed(operation, format!("invalid JSON: {err}"))
        })?;

        parsed
            .and_then(|loc| loc.key)
            .and_then(LocationKey::new)
            .ok_or_else(|| ForecastError::malformed(operation, "no location Key returned"))
    }

    async fn five_day_forecast(&self, key: &LocationKey) -> Result<Vec<DailyForecast>, ForecastError> {
        let path = format!("/forecasts/v1/daily/5day/{key}");
        let body = self
            .fetch(Operation::FiveDayForecast, &path, &[("metric", "true"), ("details", "true")])
            .await?;

        Ok(parse_five_day(&body))
    }

    async fn active_alerts(&self, key: &LocationKey) -> Result<Vec<Alert>, ForecastError> {
        let path = format!("/alerts/v1/{key}");
        let body = self.fetch(Operation::ActiveAlerts, &path, &[]).await?;

        Ok(parse_alerts(&body))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamReason;
    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn key() -> LocationKey {
        LocationKey::new("328328").unwrap()
    }

    fn coords() -> Coordinates {
        Coordinates::new(51.5, -0.1).unwrap()
    }

    #[test]
    fn maps_daily_entry() {
        let days = parse_five_day(
            &json!({
                "DailyForecasts": [{
                    "Date": "2025-06-13T07:00:00+01:00",
                    "Temperature": { "Minimum": { "Value": 9.4 }, "Maximum": { "Value": 17.2 } },
                    "Day": { "PrecipitationProbability": 42, "Wind": { "Speed": { "Value": 18.5, "Unit": "km/h" } } }
                }]
            })
            .to_string(),
        );

        assert_eq!(days.len(), 1);
        let day = &days[0];
        assert_eq!(day.temp.day, Some(17.2));
        assert_eq!(day.temp.min, Some(9.4));
        assert_eq!(day.pop, 0.42);
        assert_eq!(day.wind_kph, Some(18.5));
        assert!(day.date.is_some());
    }

    #[test]
    fn missing_fields_default() {
        let days = parse_five_day(r#"{"DailyForecasts":[{"Temperature":{}}]}"#);

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].temp.day, None);
        assert_eq!(days[0].pop, 0.0);
        assert_eq!(days[0].wind_kph, None);
        assert_eq!(days[0].date, None);
    }

    #[test]
    fn malformed_forecast_is_empty() {
        assert!(parse_five_day("").is_empty());
        assert!(parse_five_day("null").is_empty());
        assert!(parse_five_day("{}").is_empty());
        assert!(parse_five_day(r#"{"DailyForecasts":"nope"}"#).is_empty());
    }

    #[test]
    fn alerts_must_be_an_array() {
        assert_eq!(parse_alerts(r#"[{"AlertID":1}]"#), vec![json!({"AlertID": 1})]);
        assert!(parse_alerts(r#"{"AlertID":1}"#).is_empty());
        assert!(parse_alerts("").is_empty());
    }

    #[test]
    fn truncates_long_bodies_on_char_boundary() {
        let body = "é".repeat(300);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }

    #[tokio::test]
    async fn location_key_sends_coordinates_and_key() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/locations/v1/cities/geoposition/search"))
            .and(query_param("apikey", "KEY"))
            .and(query_param("q", "51.5,-0.1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "328328" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AccuWeatherClient::with_base_url("KEY".into(), &server.uri());
        let key = client.location_key(coords()).await.unwrap();

        assert_eq!(key.as_str(), "328328");
    }

    #[tokio::test]
    async fn location_401_is_auth_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/locations/v1/cities/geoposition/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Api Authorization failed"))
            .mount(&server)
            .await;

        let client = AccuWeatherClient::with_base_url("BAD".into(), &server.uri());
        let err = client.location_key(coords()).await.unwrap_err();

        match &err {
            ForecastError::Upstream(upstream) => {
                assert_eq!(upstream.reason, UpstreamReason::Auth);
                assert_eq!(upstream.operation, Operation::LocationSearch);
                assert_eq!(upstream.upstream_status, Some(StatusCode::UNAUTHORIZED));
                assert_eq!(upstream.upstream_body.as_deref(), Some("Api Authorization failed"));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
        assert_eq!(err.http_status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn location_without_key_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/locations/v1/cities/geoposition/search"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = AccuWeatherClient::with_base_url("KEY".into(), &server.uri());
        let err = client.location_key(coords()).await.unwrap_err();

        assert!(matches!(
            err,
            ForecastError::MalformedResponse { operation: Operation::LocationSearch, .. }
        ));
    }

    #[tokio::test]
    async fn location_with_empty_key_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "" })))
            .mount(&server)
            .await;

        let client = AccuWeatherClient::with_base_url("KEY".into(), &server.uri());
        let err = client.location_key(coords()).await.unwrap_err();

        assert!(matches!(err, ForecastError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn forecast_requests_metric_details() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecasts/v1/daily/5day/328328"))
            .and(query_param("metric", "true"))
            .and(query_param("details", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "DailyForecasts": [
                    { "Temperature": { "Maximum": { "Value": 16 } }, "Day": { "PrecipitationProbability": 10 } },
                    { "Temperature": { "Maximum": { "Value": 18 } }, "Day": { "PrecipitationProbability": 20 } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AccuWeatherClient::with_base_url("KEY".into(), &server.uri());
        let days = client.five_day_forecast(&key()).await.unwrap();

        assert_eq!(days.len(), 2);
        assert_eq!(days[1].temp.day, Some(18.0));
        assert_eq!(days[1].pop, 0.2);
    }

    #[tokio::test]
    async fn forecast_5xx_is_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecasts/v1/daily/5day/328328"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = AccuWeatherClient::with_base_url("KEY".into(), &server.uri());
        let err = client.five_day_forecast(&key()).await.unwrap_err();

        assert_eq!(err.reason(), Some(UpstreamReason::Unavailable));
        assert_eq!(err.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.to_string().contains("5 day forecast"));
    }

    #[tokio::test]
    async fn alerts_quota_is_plan_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/alerts/v1/328328"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = AccuWeatherClient::with_base_url("KEY".into(), &server.uri());
        let err = client.active_alerts(&key()).await.unwrap_err();

        assert_eq!(err.reason(), Some(UpstreamReason::Plan));
        assert!(err.to_string().contains("active alerts"));
    }

    #[tokio::test]
    async fn connection_refused_is_unavailable() {
        // Nothing listens on the discard port.
        let client = AccuWeatherClient::with_base_url("KEY".into(), "http://127.0.0.1:9");
        let err = client.location_key(coords()).await.unwrap_err();

        assert_eq!(err.reason(), Some(UpstreamReason::Unavailable));
        assert_eq!(err.http_status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
