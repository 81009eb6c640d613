//! IP geolocation (ipapi.co compatible).

use kisan_setu_core::{Location, LocationError};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

/// Errors from a single IP lookup.
#[derive(Debug, Error)]
pub enum GeoIpError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error payload or status.
    #[error("Geolocation service error: {0}")]
    Service(String),

    /// The answer did not name a concrete place.
    #[error("Incomplete location: {0}")]
    Incomplete(#[from] LocationError),
}

/// Response body of `GET https://ipapi.co/json/`.
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
    postal: Option<String>,
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

impl IpApiResponse {
    fn into_location(self) -> Result<Location, GeoIpError> {
        if self.error {
            return Err(GeoIpError::Service(
                self.reason.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let latitude = self.latitude.ok_or(LocationError::Missing("latitude"))?;
        let longitude = self.longitude.ok_or(LocationError::Missing("longitude"))?;

        let location = Location {
            latitude,
            longitude,
            city: self.city.unwrap_or_default(),
            state: self.region.clone().unwrap_or_default(),
            country: self.country_name.unwrap_or_else(|| "India".to_string()),
            pincode: self.postal.filter(|p| !p.trim().is_empty()),
            // The service has no district; the region is the closest match.
            district: self.region,
        };
        location.validate()?;
        Ok(location)
    }
}

/// Client for an ipapi.co-compatible geolocation endpoint.
#[derive(Debug, Clone)]
pub struct IpGeoClient {
    client: reqwest::Client,
    url: String,
}

impl IpGeoClient {
    #[must_use]
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Look up the caller's location from their public IP.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the service reports an error,
    /// or the answer lacks a concrete city and state.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn lookup(&self) -> Result<Location, GeoIpError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(GeoIpError::Service(format!("HTTP {status}")));
        }

        let body: IpApiResponse = response.json().await?;
        body.into_location()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> Result<Location, GeoIpError> {
        serde_json::from_value::<IpApiResponse>(json)
            .unwrap()
            .into_location()
    }

    #[test]
    fn test_maps_ipapi_fields() {
        let location = parse(serde_json::json!({
            "ip": "203.0.113.7",
            "latitude": 30.901,
            "longitude": 75.8573,
            "city": "Ludhiana",
            "region": "Punjab",
            "country_name": "India",
            "postal": "141001"
        }))
        .unwrap();
        assert_eq!(location.city, "Ludhiana");
        assert_eq!(location.state, "Punjab");
        assert_eq!(location.district.as_deref(), Some("Punjab"));
        assert_eq!(location.pincode.as_deref(), Some("141001"));
    }

    #[test]
    fn test_placeholder_city_is_incomplete() {
        let err = parse(serde_json::json!({
            "latitude": 0.0, "longitude": 0.0, "city": "Unknown", "region": "Unknown"
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            GeoIpError::Incomplete(LocationError::Placeholder("city"))
        ));
    }

    #[test]
    fn test_error_payload() {
        let err = parse(serde_json::json!({"error": true, "reason": "RateLimited"})).unwrap_err();
        assert!(matches!(err, GeoIpError::Service(ref r) if r == "RateLimited"));
    }

    #[test]
    fn test_missing_coordinates() {
        let err = parse(serde_json::json!({"city": "Pune", "region": "Maharashtra"})).unwrap_err();
        assert!(matches!(
            err,
            GeoIpError::Incomplete(LocationError::Missing("latitude"))
        ));
    }
}
