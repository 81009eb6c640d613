//! `/api/admin` and `/api/location` routes. None of these have offline data.

use kisan_setu_core::{Location, User, UserId};
use reqwest::Method;
use tracing::instrument;

use super::Gateway;
use super::types::{AdminStats, Ack, LocationStats, NearbyUser, NearbyUserList, UserPage};
use crate::error::ApiResult;

/// Search radius used when the caller does not pick one (km).
pub const DEFAULT_NEARBY_RADIUS_KM: f64 = 50.0;

impl Gateway {
    /// Platform-wide statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self))]
    pub async fn admin_stats(&self) -> ApiResult<AdminStats> {
        self.execute(self.request(Method::GET, "/api/admin/stats"))
            .await
    }

    /// One page of users (pages start at 1).
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self))]
    pub async fn admin_users(&self, page: u32, limit: u32) -> ApiResult<UserPage> {
        let request = self
            .request(Method::GET, "/api/admin/users")
            .query(&[("page", page.max(1)), ("limit", limit)]);
        self.execute(request).await
    }

    /// Every user, unpaginated.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self))]
    pub async fn admin_all_users(&self) -> ApiResult<Vec<User>> {
        self.execute(self.request(Method::GET, "/api/admin/all-users"))
            .await
    }

    /// Farmers and consumers within `radius_km` of a point, nearest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self))]
    pub async fn nearby_users(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> ApiResult<Vec<NearbyUser>> {
        let request = self
            .request(Method::GET, "/api/location/nearby-users")
            .query(&[
                ("latitude", latitude),
                ("longitude", longitude),
                ("radius", radius_km),
            ]);
        let mut users = self.execute::<NearbyUserList>(request).await?.users;
        users.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(users)
    }

    /// Report the signed-in user's location to the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self, location), fields(city = %location.city))]
    pub async fn update_location(&self, location: &Location) -> ApiResult<Ack> {
        self.execute(
            self.request(Method::POST, "/api/location/update-location")
                .json(location),
        )
        .await
    }

    /// Connection statistics for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self))]
    pub async fn location_stats(&self, user_id: &UserId) -> ApiResult<LocationStats> {
        self.execute(self.request(Method::GET, &format!("/api/location/user-stats/{user_id}")))
            .await
    }
}
