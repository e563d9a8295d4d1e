//! Thin Supabase client: GoTrue auth calls and PostgREST table queries.
//!
//! Table queries forward the caller's access token so row-level security
//! applies; without one they run as the anonymous role.

use std::fmt::Display;

use reqwest::{Client, Method, RequestBuilder, StatusCode, header};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::Config;

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("Supabase request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Supabase returned status {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("Supabase service role key is not configured")]
    MissingServiceRole,
}

impl SupabaseError {
    /// Message suitable for an API error body.
    pub fn message(&self) -> String {
        match self {
            SupabaseError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SupabaseError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseClient {
    url: String,
    anon_key: String,
    service_role_key: Option<String>,
    http: Client,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

impl SupabaseClient {
    pub fn new(url: &str, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            service_role_key: None,
            http: Client::new(),
        }
    }

    pub fn with_service_role(mut self, key: impl Into<String>) -> Self {
        self.service_role_key = Some(key.into());
        self
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = Self::new(config.require_supabase_url()?, config.require_supabase_anon_key()?);

        Ok(match &config.supabase.service_role_key {
            Some(key) => client.with_service_role(key.clone()),
            None => client,
        })
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Value, SupabaseError> {
        let req = self
            .auth_request(Method::POST, "/auth/v1/signup", &self.anon_key)
            .json(&Credentials { email, password });

        send(req).await
    }

    /// Returns the session (access token, refresh token, user).
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Value, SupabaseError> {
        let req = self
            .auth_request(Method::POST, "/auth/v1/token", &self.anon_key)
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password });

        send(req).await
    }

    /// Admin-only; needs the service role key.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), SupabaseError> {
        let key = self.service_role_key.as_deref().ok_or(SupabaseError::MissingServiceRole)?;
        let path = format!("/auth/v1/admin/users/{user_id}");

        send(self.auth_request(Method::DELETE, &path, key)).await?;
        Ok(())
    }

    pub fn from(&self, table: &str) -> TableQuery<'_> {
        TableQuery {
            client: self,
            table: table.to_string(),
            columns: None,
            filters: Vec::new(),
            bearer: None,
        }
    }

    fn auth_request(&self, method: Method, path: &str, key: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.url, path))
            .header("apikey", key)
            .bearer_auth(key)
    }
}

/// A PostgREST query against one table.
#[derive(Debug, Clone)]
pub struct TableQuery<'a> {
    client: &'a SupabaseClient,
    table: String,
    columns: Option<String>,
    filters: Vec<(String, String)>,
    bearer: Option<String>,
}

impl TableQuery<'_> {
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = Some(columns.to_string());
        self
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// Run as the user owning `token` instead of the anonymous role.
    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    pub async fn fetch_all(self) -> Result<Value, SupabaseError> {
        send(self.request(Method::GET)).await
    }

    /// Exactly one row; zero or several rows is an error.
    pub async fn fetch_single(self) -> Result<Value, SupabaseError> {
        send(self.request(Method::GET).header(header::ACCEPT, SINGLE_OBJECT)).await
    }

    /// Insert one row and return it.
    pub async fn insert<T: Serialize + ?Sized>(self, row: &T) -> Result<Value, SupabaseError> {
        let req = self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .header(header::ACCEPT, SINGLE_OBJECT)
            .json(row);

        send(req).await
    }

    /// Patch the single matching row and return it.
    pub async fn update<T: Serialize + ?Sized>(self, patch: &T) -> Result<Value, SupabaseError> {
        let req = self
            .request(Method::PATCH)
            .header("Prefer", "return=representation")
            .header(header::ACCEPT, SINGLE_OBJECT)
            .json(patch);

        send(req).await
    }

    pub async fn delete(self) -> Result<(), SupabaseError> {
        send(self.request(Method::DELETE)).await?;
        Ok(())
    }

    fn request(&self, method: Method) -> RequestBuilder {
        let client = self.client;
        let token = self.bearer.as_deref().unwrap_or(&client.anon_key);
        let url = format!("{}/rest/v1/{}", client.url, self.table);

        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(columns) = &self.columns {
            query.push(("select", columns.as_str()));
        }
        query.extend(self.filters.iter().map(|(col, filter)| (col.as_str(), filter.as_str())));

        client
            .http
            .request(method, url)
            .header("apikey", client.anon_key.as_str())
            .bearer_auth(token)
            .query(&query)
    }
}

async fn send(req: RequestBuilder) -> Result<Value, SupabaseError> {
    let res = req.send().await?;
    let status = res.status();
    let body = res.text().await?;

    if !status.is_success() {
        return Err(SupabaseError::Api { status, message: error_message(&body, status) });
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
}

/// PostgREST uses `message`; GoTrue uses `msg`, `error_description` or `error`.
fn error_message(body: &str, status: StatusCode) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    parsed
        .as_ref()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|field| v.get(field).and_then(Value::as_str))
        })
        .map(str::to_string)
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn select_forwards_filters_and_user_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/campsites"))
            .and(query_param("select", "*"))
            .and(query_param("user_id", "eq.user-1"))
            .and(header("apikey", "anon"))
            .and(header("authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "c1" }])))
            .expect(1)
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&server.uri(), "anon");
        let rows = client
            .from("campsites")
            .select("*")
            .eq("user_id", "user-1")
            .bearer("user-token")
            .fetch_all()
            .await
            .unwrap();

        assert_eq!(rows, json!([{ "id": "c1" }]));
    }

    #[tokio::test]
    async fn insert_asks_for_single_representation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/favourites"))
            .and(header("prefer", "return=representation"))
            .and(header("accept", SINGLE_OBJECT))
            .and(body_json(json!({ "user_id": "u", "campsite_id": "c" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&server.uri(), "anon");
        let row = client
            .from("favourites")
            .insert(&json!({ "user_id": "u", "campsite_id": "c" }))
            .await
            .unwrap();

        assert_eq!(row, json!({ "id": 1 }));
    }

    #[tokio::test]
    async fn delete_accepts_empty_body() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/rest/v1/campsites"))
            .and(query_param("id", "eq.c1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&server.uri(), "anon");
        client.from("campsites").eq("id", "c1").delete().await.unwrap();
    }

    #[tokio::test]
    async fn postgrest_error_message_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/campsites"))
            .respond_with(ResponseTemplate::new(406).set_body_json(json!({
                "code": "PGRST116",
                "message": "JSON object requested, multiple (or no) rows returned"
            })))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&server.uri(), "anon");
        let err = client.from("campsites").eq("id", "missing").fetch_single().await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::NOT_ACCEPTABLE));
        assert_eq!(err.message(), "JSON object requested, multiple (or no) rows returned");
    }

    #[tokio::test]
    async fn password_sign_in() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_json(json!({ "email": "a@b.co", "password": "secret1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "jwt" })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(body_json(json!({ "email": "a@b.co", "password": "wrong" })))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&server.uri(), "anon");

        let session = client.sign_in_with_password("a@b.co", "secret1").await.unwrap();
        assert_eq!(session["access_token"], "jwt");

        let err = client.sign_in_with_password("a@b.co", "wrong").await.unwrap_err();
        assert_eq!(err.message(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn delete_user_needs_service_role() {
        let client = SupabaseClient::new("http://127.0.0.1:9", "anon");
        let err = client.delete_user("u1").await.unwrap_err();
        assert!(matches!(err, SupabaseError::MissingServiceRole));

        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/auth/v1/admin/users/u1"))
            .and(header("authorization", "Bearer service"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&server.uri(), "anon").with_service_role("service");
        client.delete_user("u1").await.unwrap();
    }

    #[test]
    fn error_message_fallbacks() {
        assert_eq!(error_message(r#"{"msg":"User already registered"}"#, StatusCode::BAD_REQUEST), "User already registered");
        assert_eq!(error_message("plain text", StatusCode::BAD_REQUEST), "plain text");
        assert_eq!(error_message("", StatusCode::BAD_GATEWAY), "request failed with status 502");
    }
}
