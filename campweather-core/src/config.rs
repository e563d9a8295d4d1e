use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf};

use crate::{forecast::AlertFailurePolicy, provider::ProviderId};

const DEFAULT_PORT: u16 = 8000;

/// Credentials for a single upstream provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,

    /// Overrides the provider's public endpoint (staging, mocks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Supabase project settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    /// Only needed for admin operations (test user cleanup).
    pub service_role_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    /// HS256 secret used to verify bearer tokens.
    pub jwt_secret: Option<String>,

    /// Mounts `DELETE /test/cleanup-user`. Never enable in production.
    #[serde(default)]
    pub allow_test_cleanup: bool,

    pub test_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            jwt_secret: None,
            allow_test_cleanup: false,
            test_secret: None,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Top-level configuration, built once at start-up and passed down explicitly.
///
/// Example TOML:
/// ```toml
/// alert_failure_policy = "degrade"
///
/// [providers.accuweather]
/// api_key = "..."
///
/// [supabase]
/// url = "https://xyz.supabase.co"
/// anon_key = "..."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub alert_failure_policy: AlertFailurePolicy,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub supabase: SupabaseConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Config file, then `.env`, then the process environment (later wins).
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file()?;

        if let Err(err) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {err}");
        }

        cfg.apply_env(|name| std::env::var(name).ok())?;
        Ok(cfg)
    }

    /// Load the config file, or return an empty default if it doesn't exist yet.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "campweather", "campweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay values from environment-style variables.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        if let Some(key) = var("ACCUWEATHER_API_KEY") {
            self.upsert_provider_api_key(ProviderId::AccuWeather, key);
        }
        if let Some(url) = var("ACCUWEATHER_BASE_URL") {
            self.set_provider_base_url(ProviderId::AccuWeather, url)?;
        }
        if let Some(key) = var("GEOAPIFY_KEY") {
            self.upsert_provider_api_key(ProviderId::Geoapify, key);
        }
        if let Some(url) = var("GEOAPIFY_BASE_URL") {
            self.set_provider_base_url(ProviderId::Geoapify, url)?;
        }

        if let Some(url) = var("SUPABASE_URL") {
            self.supabase.url = Some(url);
        }
        if let Some(key) = var("SUPABASE_ANON_KEY") {
            self.supabase.anon_key = Some(key);
        }
        if let Some(key) = var("SUPABASE_SERVICE_ROLE") {
            self.supabase.service_role_key = Some(key);
        }

        if let Some(secret) = var("JWT_SECRET") {
            self.server.jwt_secret = Some(secret);
        }
        if let Some(port) = var("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid PORT value '{port}'"))?;
        }
        if let Some(flag) = var("ALLOW_TEST_CLEANUP") {
            self.server.allow_test_cleanup = flag == "true";
        }
        if let Some(secret) = var("TEST_SECRET") {
            self.server.test_secret = Some(secret);
        }

        if let Some(policy) = var("ALERT_FAILURE_POLICY") {
            self.alert_failure_policy = AlertFailurePolicy::try_from(policy.as_str())?;
        }

        Ok(())
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Set/replace a provider API key, keeping any base URL override.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers
            .entry(provider_id.as_str().to_string())
            .and_modify(|cfg| cfg.api_key = api_key.clone())
            .or_insert(ProviderConfig { api_key, base_url: None });
    }

    fn set_provider_base_url(&mut self, provider_id: ProviderId, url: String) -> Result<()> {
        let cfg = self.providers.get_mut(provider_id.as_str()).ok_or_else(|| {
            anyhow!("A base URL was set for provider '{provider_id}' but it has no API key.")
        })?;
        cfg.base_url = Some(url);
        Ok(())
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).map(|cfg| cfg.api_key.as_str())
    }

    pub fn provider_base_url(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).and_then(|cfg| cfg.base_url.as_deref())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }

    pub fn require_provider_api_key(&self, id: ProviderId) -> Result<&str> {
        self.provider_api_key(id).ok_or_else(|| {
            anyhow!(
                "No API key configured for provider '{id}'.\n\
                 Hint: set {} or run `campweather configure {id}`.",
                id.env_var()
            )
        })
    }

    pub fn require_jwt_secret(&self) -> Result<&str> {
        required(self.server.jwt_secret.as_deref(), "JWT_SECRET")
    }

    pub fn require_supabase_url(&self) -> Result<&str> {
        required(self.supabase.url.as_deref(), "SUPABASE_URL")
    }

    pub fn require_supabase_anon_key(&self) -> Result<&str> {
        required(self.supabase.anon_key.as_deref(), "SUPABASE_ANON_KEY")
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    value.ok_or_else(|| {
        anyhow!(
            "Missing required setting \"{name}\". \
             Set it in your environment or .env file before starting the server."
        )
    })
}
