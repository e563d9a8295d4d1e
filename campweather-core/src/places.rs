//! Geoapify places search. Responses are passed through as raw JSON.

use anyhow::{Context, Result, anyhow, ensure};
use reqwest::Client;
use serde_json::Value;

use crate::{Config, model::Coordinates, provider::ProviderId};

const DEFAULT_BASE_URL: &str = "https://api.geoapify.com";
const CAMPSITE_CATEGORY: &str = "tourism.camping";
const ATTRACTION_CATEGORY: &str = "tourism.attraction";
const CAMPSITE_COUNTRY_FILTER: &str = "countrycode:gb";
const ATTRACTION_RADIUS_M: u32 = 5000;

#[derive(Debug, Clone)]
pub struct PlacesClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl PlacesClient {
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

    pub fn from_config(config: &Config) -> Result<Self> {
        let id = ProviderId::Geoapify;
        let api_key = config.require_provider_api_key(id)?.to_owned();

        Ok(match config.provider_base_url(id) {
            Some(base_url) => Self::with_base_url(api_key, base_url),
            None => Self::new(api_key),
        })
    }

    /// Campsites in Great Britain matching `query`.
    pub async fn search_campsites(&self, query: &str) -> Result<Value> {
        let query = query.trim();
        ensure!(!query.is_empty(), "Campsite search query must not be empty");

        self.fetch(
            "campsite search",
            &[
                ("categories", CAMPSITE_CATEGORY.to_string()),
                ("filter", CAMPSITE_COUNTRY_FILTER.to_string()),
                ("text", query.to_string()),
            ],
        )
        .await
    }

    /// Attractions within 5 km of `coords`.
    pub async fn nearby_attractions(&self, coords: Coordinates) -> Result<Value> {
        let filter = format!("circle:{},{},{}", coords.lon, coords.lat, ATTRACTION_RADIUS_M);

        self.fetch(
            "nearby attractions",
            &[("categories", ATTRACTION_CATEGORY.to_string()), ("filter", filter)],
        )
        .await
    }

    async fn fetch(&self, what: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}/v2/places", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(params)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("Failed to send request to Geoapify ({what})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read Geoapify {what} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "Geoapify {what} request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).with_context(|| format!("Failed to parse Geoapify {what} JSON"))
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
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn campsite_search_passes_json_through() {
        let server = MockServer::start().await;
        let body = json!({ "type": "FeatureCollection", "features": [{ "properties": { "name": "Lakeside" } }] });

        Mock::given(method("GET"))
            .and(path("/v2/places"))
            .and(query_param("categories", "tourism.camping"))
            .and(query_param("filter", "countrycode:gb"))
            .and(query_param("text", "lake district"))
            .and(query_param("apiKey", "GEO"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let client = PlacesClient::with_base_url("GEO".into(), &server.uri());
        let result = client.search_campsites("  lake district ").await.unwrap();

        assert_eq!(result, body);
    }

    #[tokio::test]
    async fn attractions_use_lon_lat_circle() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/places"))
            .and(query_param("categories", "tourism.attraction"))
            .and(query_param("filter", "circle:-3.1,54.4,5000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "features": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let client = PlacesClient::with_base_url("GEO".into(), &server.uri());
        let coords = Coordinates::new(54.4, -3.1).unwrap();
        let result = client.nearby_attractions(coords).await.unwrap();

        assert_eq!(result, json!({ "features": [] }));
    }

    #[tokio::test]
    async fn empty_query_is_rejected_without_a_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = PlacesClient::with_base_url("GEO".into(), &server.uri());
        let err = client.search_campsites("   ").await.unwrap_err();

        assert!(err.to_string().contains("must not be empty"));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/places"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid apiKey"))
            .mount(&server)
            .await;

        let client = PlacesClient::with_base_url("BAD".into(), &server.uri());
        let err = client.search_campsites("cornwall").await.unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("401"), "{msg}");
        assert!(msg.contains("Invalid apiKey"), "{msg}");
    }

    #[test]
    fn from_config_requires_key() {
        let err = PlacesClient::from_config(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("GEOAPIFY_KEY"));
    }
}
