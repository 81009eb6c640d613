//! Integration tests for the Kisan Setu client.
//!
//! Every test runs an [`AppState`] against a `wiremock` server standing in
//! for the backend, the IP geolocation service and OpenWeatherMap, with state
//! persisted to a temporary directory.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p kisan-setu-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `gateway` - live responses, offline substitutes, 401 handling, cancellation
//! - `session` - sign-in flow, persistence across restarts, expiry
//! - `checkout` - order submission, first-order discount, local history
//! - `location_weather` - IP geolocation retries, weather client
//! - `catalog` - overlapping refreshes

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use kisan_setu_client::api::RouteTracker;
use kisan_setu_client::{AppState, ClientConfig};
use secrecy::SecretString;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Weather key configured for every test state.
pub const WEATHER_KEY: &str = "0a1b2c3d4e5f";

/// Path the geolocation service is mounted at.
pub const GEOIP_PATH: &str = "/json/";

/// A mock server, a data directory and an app state wired to both.
pub struct TestContext {
    pub server: MockServer,
    pub router: Arc<RouteTracker>,
    pub state: AppState,
    dir: TempDir,
}

impl TestContext {
    /// Start a context whose front end shows `/`.
    pub async fn new() -> Self {
        Self::at_route("/").await
    }

    /// Start a context whose front end shows `route`.
    pub async fn at_route(route: &str) -> Self {
        let server = MockServer::start().await;
        let dir = TempDir::new().expect("Failed to create data directory");
        let router = Arc::new(RouteTracker::new(route));
        let state = AppState::open(config_for(&server, dir.path()), router.clone())
            .expect("Failed to open app state");

        Self {
            server,
            router,
            state,
            dir,
        }
    }

    /// A fresh state over the same data directory, as after a restart.
    #[must_use]
    pub fn reopen(&self) -> AppState {
        AppState::open(config_for(&self.server, self.dir.path()), self.router.clone())
            .expect("Failed to reopen app state")
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Configuration pointing every service at `server`.
#[must_use]
pub fn config_for(server: &MockServer, data_dir: &Path) -> ClientConfig {
    ClientConfig {
        api_url: server.uri(),
        data_dir: data_dir.to_path_buf(),
        geoip_url: format!("{}{GEOIP_PATH}", server.uri()),
        geoip_attempts: 2,
        weather_url: server.uri(),
        weather_api_key: Some(SecretString::from(WEATHER_KEY.to_string())),
        http_timeout: Duration::from_secs(5),
        sentry_dsn: None,
    }
}

/// Profile body as served by `GET /auth/profile`.
#[must_use]
pub fn profile_json(id: i64, username: &str, role: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "email": format!("{username}@kisansetu.in"),
        "full_name": "Test User",
        "user_type": role,
        "is_active": true,
        "created_at": "2025-01-15T10:30:00"
    })
}

/// Accept `username` with any password, issuing `token`.
pub async fn mount_login(server: &MockServer, username: &str, role: &str, token: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "token_type": "bearer"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/profile"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json(7, username, role)))
        .mount(server)
        .await;
}

/// Product body as served by the marketplace routes.
#[must_use]
pub fn product_json(id: i64, name: &str, price: f64, category: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "price": price,
        "category": category,
        "seller_name": "Test Farm",
        "location": "Nashik",
        "organic": false,
        "quantity_available": 100
    })
}
