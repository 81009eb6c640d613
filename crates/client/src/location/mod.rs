//! Location resolution.
//!
//! Resolution order:
//! 1. The persisted location, if it names a concrete city and state
//! 2. IP geolocation, retried up to the configured number of attempts
//! 3. [`Location::fallback`] (central Delhi)
//!
//! Resolution never fails. Concurrent callers share one in-flight
//! resolution. Live results are cached in memory and persisted; the fallback
//! is neither, so the next call tries again.

mod geoip;

use std::sync::Arc;

use kisan_setu_core::types::location::{city_by_name, nearest_city};
use kisan_setu_core::{Location, LocationError, ReferenceCity};
use moka::future::Cache;
use tracing::instrument;

use crate::api::{Degradable, DegradableExt, Fallback};
use crate::store::{Store, keys};

pub use geoip::{GeoIpError, IpGeoClient};

/// Resolves and caches the user's location.
///
/// Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct LocationResolver {
    inner: Arc<LocationResolverInner>,
}

struct LocationResolverInner {
    store: Store,
    geoip: IpGeoClient,
    attempts: u32,
    cache: Cache<(), Location>,
}

impl LocationResolver {
    /// Create a resolver. `attempts` is clamped to at least one.
    #[must_use]
    pub fn new(store: Store, geoip: IpGeoClient, attempts: u32) -> Self {
        Self {
            inner: Arc::new(LocationResolverInner {
                store,
                geoip,
                attempts: attempts.max(1),
                cache: Cache::builder().max_capacity(1).build(),
            }),
        }
    }

    /// The best available location. Never fails.
    pub async fn current_location(&self) -> Location {
        self.resolve().await.into_value()
    }

    /// Resolve the location, reporting whether the result is the fallback.
    pub async fn resolve(&self) -> Degradable<Location> {
        self.inner
            .cache
            .try_get_with((), self.resolve_uncached())
            .await
            .map_err(|fallback| Fallback::clone(&fallback))
    }

    /// Forget any cached or persisted location and resolve again.
    pub async fn refresh(&self) -> Degradable<Location> {
        self.inner.cache.invalidate(&()).await;
        self.inner.store.remove(keys::LOCATION);
        self.resolve().await
    }

    /// Store a user-entered location.
    ///
    /// # Errors
    ///
    /// Returns a [`LocationError`] if the location is not concrete. Nothing is
    /// changed in that case.
    pub async fn set_manual(&self, location: Location) -> Result<(), LocationError> {
        location.validate()?;
        self.inner.store.set(keys::LOCATION, &location);
        self.inner.cache.insert((), location).await;
        Ok(())
    }

    /// Store the reference city called `name`, if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Missing`] if `name` is not in the reference
    /// table.
    pub async fn set_city(&self, name: &str) -> Result<Location, LocationError> {
        let city = city_by_name(name).ok_or(LocationError::Missing("city"))?;
        let location = city.to_location();
        self.set_manual(location.clone()).await?;
        Ok(location)
    }

    /// The reference city closest to `location`.
    #[must_use]
    pub fn nearest_reference(location: &Location) -> &'static ReferenceCity {
        nearest_city(location.latitude, location.longitude)
    }

    #[instrument(skip(self))]
    async fn resolve_uncached(&self) -> Result<Location, Fallback<Location>> {
        if let Some(saved) = self.inner.store.get::<Location>(keys::LOCATION) {
            if saved.is_concrete() {
                return Ok(saved);
            }
            tracing::debug!(city = %saved.city, "Ignoring placeholder saved location");
        }

        let mut last_error = None;
        for attempt in 1..=self.inner.attempts {
            match self.inner.geoip.lookup().await {
                Ok(location) => {
                    tracing::info!(city = %location.city, state = %location.state, "Location resolved from IP");
                    self.inner.store.set(keys::LOCATION, &location);
                    return Ok(location);
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "IP geolocation failed");
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error.map_or_else(|| "no attempts made".to_string(), |e| e.to_string());
        tracing::warn!(reason = %reason, "Using fallback location");
        Err(Fallback::new(Location::fallback(), reason))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Resolver whose IP lookups always fail fast (nothing listens on port 9).
    fn offline_resolver(store: Store) -> LocationResolver {
        let geoip = IpGeoClient::new(reqwest::Client::new(), "http://127.0.0.1:9/json/");
        LocationResolver::new(store, geoip, 1)
    }

    #[tokio::test]
    async fn test_saved_concrete_location_wins() {
        let store = Store::in_memory();
        let pune = city_by_name("Pune").unwrap().to_location();
        store.set(keys::LOCATION, &pune);

        let resolver = offline_resolver(store);
        assert_eq!(resolver.resolve().await, Ok(pune));
    }

    #[tokio::test]
    async fn test_placeholder_saved_location_falls_back() {
        let store = Store::in_memory();
        let mut unknown = Location::fallback();
        unknown.city = "Unknown".to_string();
        store.set(keys::LOCATION, &unknown);

        let resolver = offline_resolver(store.clone());
        let resolved = resolver.resolve().await;
        assert!(resolved.is_fallback());
        assert_eq!(resolved.into_value(), Location::fallback());
    }

    #[tokio::test]
    async fn test_fallback_is_not_persisted() {
        let store = Store::in_memory();
        let resolver = offline_resolver(store.clone());
        assert_eq!(resolver.current_location().await, Location::fallback());
        assert!(store.get::<Location>(keys::LOCATION).is_none());
    }

    #[tokio::test]
    async fn test_set_manual_validates() {
        let store = Store::in_memory();
        let resolver = offline_resolver(store.clone());

        let mut blank = Location::fallback();
        blank.state = String::new();
        assert_eq!(
            resolver.set_manual(blank).await,
            Err(LocationError::Missing("state"))
        );
        assert!(store.get::<Location>(keys::LOCATION).is_none());

        let jaipur = resolver.set_city("jaipur").await.unwrap();
        assert_eq!(jaipur.city, "Jaipur");
        assert_eq!(resolver.resolve().await, Ok(jaipur.clone()));
        assert_eq!(store.get::<Location>(keys::LOCATION), Some(jaipur));
    }

    #[tokio::test]
    async fn test_unknown_city_name() {
        let resolver = offline_resolver(Store::in_memory());
        assert!(resolver.set_city("Atlantis").await.is_err());
    }
}
