//! Geographic context for a user.
//!
//! A [`Location`] is only worth caching once it names a real place: city and
//! state must be present and must not be the `"Unknown"` placeholder that IP
//! lookups return for unroutable addresses.

use serde::{Deserialize, Serialize};

/// Placeholder returned by geolocation services when they cannot place an
/// address.
pub const PLACEHOLDER: &str = "Unknown";

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Errors raised when validating a [`Location`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// A required field is blank.
    #[error("{0} cannot be empty")]
    Missing(&'static str),
    /// A field holds the geolocation placeholder.
    #[error("{0} is a placeholder value")]
    Placeholder(&'static str),
    /// Coordinates are out of range.
    #[error("coordinates out of range: {latitude}, {longitude}")]
    Coordinates {
        /// Offending latitude.
        latitude: String,
        /// Offending longitude.
        longitude: String,
    },
}

/// A resolved geographic location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub state: String,
    pub country: String,
    /// Postal (PIN) code.
    #[serde(default, alias = "postal_code")]
    pub pincode: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
}

impl Location {
    /// The static reference location used when nothing else resolves.
    ///
    /// Always returns the same value (central Delhi).
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            latitude: 28.6139,
            longitude: 77.2090,
            city: "Delhi".to_string(),
            state: "Delhi".to_string(),
            country: "India".to_string(),
            pincode: Some("110001".to_string()),
            district: Some("Delhi".to_string()),
        }
    }

    /// Check that the location names a concrete place.
    ///
    /// # Errors
    ///
    /// Returns an error if city or state is blank or `"Unknown"`, or if the
    /// coordinates are not finite and in range.
    pub fn validate(&self) -> Result<(), LocationError> {
        check_concrete("city", &self.city)?;
        check_concrete("state", &self.state)?;

        let lat_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let lon_ok = self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);
        if !lat_ok || !lon_ok {
            return Err(LocationError::Coordinates {
                latitude: self.latitude.to_string(),
                longitude: self.longitude.to_string(),
            });
        }

        Ok(())
    }

    /// Whether the location may be cached.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.validate().is_ok()
    }

    /// Great-circle distance to `other` in kilometres.
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    /// `"City, State"`, the format used to pre-fill delivery addresses.
    #[must_use]
    pub fn short_address(&self) -> String {
        format!("{}, {}", self.city, self.state)
    }
}

fn check_concrete(field: &'static str, value: &str) -> Result<(), LocationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LocationError::Missing(field));
    }
    if trimmed.eq_ignore_ascii_case(PLACEHOLDER) {
        return Err(LocationError::Placeholder(field));
    }
    Ok(())
}

/// Haversine distance between two coordinates, in kilometres.
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// A major city from the built-in reference table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceCity {
    pub city: &'static str,
    pub state: &'static str,
    pub pincode: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

impl ReferenceCity {
    /// Convert to a [`Location`] in India.
    #[must_use]
    pub fn to_location(&self) -> Location {
        Location {
            latitude: self.latitude,
            longitude: self.longitude,
            city: self.city.to_string(),
            state: self.state.to_string(),
            country: "India".to_string(),
            pincode: Some(self.pincode.to_string()),
            district: Some(self.state.to_string()),
        }
    }
}

macro_rules! city {
    ($city:literal, $state:literal, $pin:literal, $lat:literal, $lon:literal) => {
        ReferenceCity {
            city: $city,
            state: $state,
            pincode: $pin,
            latitude: $lat,
            longitude: $lon,
        }
    };
}

/// Reference table of major Indian cities.
pub const INDIAN_CITIES: &[ReferenceCity] = &[
    city!("Delhi", "Delhi", "110001", 28.6139, 77.2090),
    city!("Mumbai", "Maharashtra", "400001", 19.0760, 72.8777),
    city!("Bangalore", "Karnataka", "560001", 12.9716, 77.5946),
    city!("Chennai", "Tamil Nadu", "600001", 13.0827, 80.2707),
    city!("Kolkata", "West Bengal", "700001", 22.5726, 88.3639),
    city!("Hyderabad", "Telangana", "500001", 17.3850, 78.4867),
    city!("Pune", "Maharashtra", "411001", 18.5204, 73.8567),
    city!("Ahmedabad", "Gujarat", "380001", 23.0225, 72.5714),
    city!("Jaipur", "Rajasthan", "302001", 26.9124, 75.7873),
    city!("Lucknow", "Uttar Pradesh", "226001", 26.8467, 80.9462),
    city!("Chandigarh", "Punjab", "160001", 30.7333, 76.7794),
    city!("Bhopal", "Madhya Pradesh", "462001", 23.2599, 77.4126),
    city!("Indore", "Madhya Pradesh", "452001", 22.7196, 75.8577),
    city!("Patna", "Bihar", "800001", 25.5941, 85.1376),
    city!("Nagpur", "Maharashtra", "440001", 21.1458, 79.0882),
    city!("Surat", "Gujarat", "395001", 21.1702, 72.8311),
    city!("Coimbatore", "Tamil Nadu", "641001", 11.0168, 76.9558),
    city!("Kochi", "Kerala", "682001", 9.9312, 76.2673),
    city!("Visakhapatnam", "Andhra Pradesh", "530001", 17.6868, 83.2185),
    city!("Agra", "Uttar Pradesh", "282001", 27.1767, 78.0081),
];

/// Look up a reference city by name (case-insensitive).
#[must_use]
pub fn city_by_name(name: &str) -> Option<&'static ReferenceCity> {
    let name = name.trim();
    INDIAN_CITIES
        .iter()
        .find(|c| c.city.eq_ignore_ascii_case(name))
}

/// The reference city closest to the given coordinates.
#[must_use]
pub fn nearest_city(latitude: f64, longitude: f64) -> &'static ReferenceCity {
    INDIAN_CITIES
        .iter()
        .min_by(|a, b| {
            let da = haversine_km(latitude, longitude, a.latitude, a.longitude);
            let db = haversine_km(latitude, longitude, b.latitude, b.longitude);
            da.total_cmp(&db)
        })
        .unwrap_or(&DELHI)
}

const DELHI: ReferenceCity = city!("Delhi", "Delhi", "110001", 28.6139, 77.2090);
