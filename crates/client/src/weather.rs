//! OpenWeatherMap client.
//!
//! Weather is decoration, not data the app depends on: every call returns
//! `None` instead of an error, and nothing is sent without an API key.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::mock::DEFAULT_CITY;

/// Temperature and pressure readings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Readings {
    /// Degrees Celsius.
    pub temp: f64,
    pub feels_like: f64,
    /// Percent.
    pub humidity: f64,
    /// hPa.
    pub pressure: f64,
}

/// A weather condition, e.g. `Clouds` / `scattered clouds`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Condition {
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wind {
    /// Metres per second.
    pub speed: f64,
}

/// `GET /data/2.5/weather` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub name: String,
    pub main: Readings,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub wind: Wind,
}

impl CurrentWeather {
    /// The primary condition, if reported.
    #[must_use]
    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }
}

/// One three-hour forecast slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    /// Unix timestamp.
    pub dt: i64,
    pub main: Readings,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub dt_txt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastCity {
    pub name: String,
    pub country: String,
}

/// `GET /data/2.5/forecast` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub list: Vec<ForecastEntry>,
    #[serde(default)]
    pub city: ForecastCity,
}

/// OpenWeatherMap client. Cheap to clone.
#[derive(Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl std::fmt::Debug for WeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl WeatherClient {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<SecretString>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Whether an API key is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Current conditions in `city` (Delhi when `None`).
    pub async fn current(&self, city: Option<&str>) -> Option<CurrentWeather> {
        self.fetch("weather", city).await
    }

    /// Five-day, three-hourly forecast for `city` (Delhi when `None`).
    pub async fn forecast(&self, city: Option<&str>) -> Option<Forecast> {
        self.fetch("forecast", city).await
    }

    #[instrument(skip(self))]
    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        city: Option<&str>,
    ) -> Option<T> {
        let Some(key) = &self.api_key else {
            tracing::debug!("No weather API key configured");
            return None;
        };
        let city = city.filter(|c| !c.trim().is_empty()).unwrap_or(DEFAULT_CITY);

        let response = match self
            .client
            .get(format!("{}/data/2.5/{endpoint}", self.base_url))
            .query(&[
                ("q", city),
                ("appid", key.expose_secret()),
                ("units", "metric"),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Weather request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "Weather service returned non-success status");
            return None;
        }

        match response.json().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse weather response");
                None
            }
        }
    }
}
