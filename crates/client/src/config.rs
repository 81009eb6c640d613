//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `KISAN_SETU_API_URL` - Backend base URL (default: `http://localhost:8001`)
//! - `KISAN_SETU_DATA_DIR` - Directory for persisted state (default: `.kisan-setu`)
//! - `KISAN_SETU_GEOIP_URL` - IP geolocation endpoint (default: `https://ipapi.co/json/`)
//! - `KISAN_SETU_GEOIP_ATTEMPTS` - IP lookups before falling back (default: 2)
//! - `KISAN_SETU_WEATHER_URL` - OpenWeatherMap base URL (default: `https://api.openweathermap.org`)
//! - `KISAN_SETU_WEATHER_API_KEY` - OpenWeatherMap API key (weather is disabled without it)
//! - `KISAN_SETU_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8001";
const DEFAULT_DATA_DIR: &str = ".kisan-setu";
const DEFAULT_GEOIP_URL: &str = "https://ipapi.co/json/";
const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org";
const DEFAULT_GEOIP_ATTEMPTS: u32 = 2;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "api-key",
    "api_key",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Client configuration.
///
/// Implements `Debug` manually to redact the weather API key.
#[derive(Clone)]
pub struct ClientConfig {
    /// Kisan Setu backend base URL, without a trailing slash
    pub api_url: String,
    /// Directory holding one JSON file per persisted key
    pub data_dir: PathBuf,
    /// IP geolocation endpoint (ipapi.co compatible)
    pub geoip_url: String,
    /// How many IP lookups to try before using the fallback location
    pub geoip_attempts: u32,
    /// OpenWeatherMap base URL, without a trailing slash
    pub weather_url: String,
    /// OpenWeatherMap API key
    pub weather_api_key: Option<SecretString>,
    /// Timeout applied to every outgoing request
    pub http_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url)
            .field("data_dir", &self.data_dir)
            .field("geoip_url", &self.geoip_url)
            .field("geoip_attempts", &self.geoip_attempts)
            .field("weather_url", &self.weather_url)
            .field(
                "weather_api_key",
                &self.weather_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("http_timeout", &self.http_timeout)
            .field("sentry_dsn", &self.sentry_dsn)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            geoip_url: DEFAULT_GEOIP_URL.to_string(),
            geoip_attempts: DEFAULT_GEOIP_ATTEMPTS,
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            weather_api_key: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            sentry_dsn: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed, or if the
    /// weather API key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    fn from_lookup(env: Lookup<'_>) -> Result<Self, ConfigError> {
        let api_url = get_url(env, "KISAN_SETU_API_URL", DEFAULT_API_URL)?;
        let data_dir = PathBuf::from(get_env_or_default(env, "KISAN_SETU_DATA_DIR", DEFAULT_DATA_DIR));
        let geoip_url = get_url(env, "KISAN_SETU_GEOIP_URL", DEFAULT_GEOIP_URL)?;
        let weather_url = get_url(env, "KISAN_SETU_WEATHER_URL", DEFAULT_WEATHER_URL)?;

        let geoip_attempts = get_parsed(env, "KISAN_SETU_GEOIP_ATTEMPTS", DEFAULT_GEOIP_ATTEMPTS)?;
        if geoip_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "KISAN_SETU_GEOIP_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let timeout_secs = get_parsed(env, "KISAN_SETU_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;

        let weather_api_key = get_optional_env(env, "KISAN_SETU_WEATHER_API_KEY")
            .map(|key| {
                validate_not_placeholder(&key, "KISAN_SETU_WEATHER_API_KEY")?;
                Ok::<_, ConfigError>(SecretString::from(key))
            })
            .transpose()?;

        Ok(Self {
            api_url: trim_trailing_slash(api_url),
            data_dir,
            geoip_url,
            geoip_attempts,
            weather_url: trim_trailing_slash(weather_url),
            weather_api_key,
            http_timeout: Duration::from_secs(timeout_secs),
            sentry_dsn: get_optional_env(env, "SENTRY_DSN"),
        })
    }

    /// The weather API key, if configured.
    #[must_use]
    pub fn weather_key(&self) -> Option<&str> {
        self.weather_api_key.as_ref().map(ExposeSecret::expose_secret)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(env: Lookup<'_>, key: &str) -> Option<String> {
    env(key).filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(env: Lookup<'_>, key: &str, default: &str) -> String {
    get_optional_env(env, key).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable parsed into `T`, or `default` when unset.
fn get_parsed<T>(env: Lookup<'_>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(env, key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Get an environment variable that must be an absolute http(s) URL.
fn get_url(env: Lookup<'_>, key: &str, default: &str) -> Result<String, ConfigError> {
    let raw = get_env_or_default(env, key, default);
    let parsed = Url::parse(&raw)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }
    Ok(raw)
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

/// Reject values that are obviously copied from documentation.
fn validate_not_placeholder(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}
