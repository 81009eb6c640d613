//! Application state shared by every front end.

use std::sync::Arc;

use kisan_setu_core::{DeliveryInfo, Language, User, UserUpdate};
use thiserror::Error;
use tracing::instrument;

use crate::api::types::{CropImageAnalysis, RegisterRequest};
use crate::api::{CropImage, Degradable, DegradableExt, Fallback, Gateway, Navigator};
use crate::cart::{CartService, PlaceOrderError, PlacedOrder};
use crate::catalog::Catalog;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::location::{IpGeoClient, LocationResolver};
use crate::scans::{CropScan, ScanHistory};
use crate::session::{ActivityMonitor, AuthManager, AuthState, LoginOptions};
use crate::store::Store;
use crate::weather::WeatherClient;

/// Error creating or driving the application state.
#[derive(Debug, Error)]
pub enum AppStateError {
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// `sign_in`/`sign_up` while a session exists or another sign-in runs.
    #[error("already signed in or signing in")]
    SignInBusy,
}

impl AppStateError {
    /// Message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self, language: Language) -> String {
        match (self, language) {
            (Self::Api(e), _) => e.user_message(language),
            (Self::SignInBusy, Language::En) => "You are already signed in.".to_string(),
            (Self::SignInBusy, Language::Hi) => "आप पहले से साइन इन हैं।".to_string(),
            (Self::Storage(_), Language::En) => "Could not open local storage.".to_string(),
            (Self::Storage(_), Language::Hi) => "स्थानीय संग्रह नहीं खुल सका।".to_string(),
        }
    }
}

/// Root object owning the store, session, location, cart, catalog and
/// clients.
///
/// Cheaply cloneable via `Arc`. There is no global state: front ends create
/// one `AppState` and pass it around.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ClientConfig,
    store: Store,
    gateway: Gateway,
    auth: AuthManager,
    location: LocationResolver,
    cart: CartService,
    catalog: Catalog,
    weather: WeatherClient,
    scans: ScanHistory,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("gateway", &self.inner.gateway)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create the state with file persistence under `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or the HTTP
    /// client cannot be built.
    pub fn open(config: ClientConfig, navigator: Arc<dyn Navigator>) -> Result<Self, AppStateError> {
        let store = Store::open(config.data_dir.clone())?;
        Self::with_store(config, store, navigator)
    }

    /// Create the state over an existing store.
    ///
    /// The persisted session is not loaded yet; call [`AppState::restore`].
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn with_store(
        config: ClientConfig,
        store: Store,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, AppStateError> {
        let gateway = Gateway::new(&config, store.clone(), navigator)?;

        // Third-party services share one pool; the gateway keeps its own
        // because it sends default JSON headers.
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(ApiError::Http)?;

        let location = LocationResolver::new(
            store.clone(),
            IpGeoClient::new(http.clone(), config.geoip_url.clone()),
            config.geoip_attempts,
        );
        let weather = WeatherClient::new(http, &config.weather_url, config.weather_api_key.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                auth: AuthManager::new(store.clone()),
                cart: CartService::new(store.clone()),
                scans: ScanHistory::new(store.clone()),
                catalog: Catalog::new(),
                config,
                store,
                gateway,
                location,
                weather,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.inner.gateway
    }

    #[must_use]
    pub fn auth(&self) -> &AuthManager {
        &self.inner.auth
    }

    #[must_use]
    pub fn location(&self) -> &LocationResolver {
        &self.inner.location
    }

    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn weather(&self) -> &WeatherClient {
        &self.inner.weather
    }

    #[must_use]
    pub fn scans(&self) -> &ScanHistory {
        &self.inner.scans
    }

    /// Load the persisted session (app start).
    ///
    /// The cart is reloaded afterwards: an expired session takes the
    /// persisted cart with it.
    pub async fn restore(&self) -> AuthState {
        let state = self.inner.auth.restore().await;
        self.inner.cart.reload().await;
        state
    }

    /// Start coalescing user input into activity updates.
    #[must_use]
    pub fn spawn_activity_monitor(&self) -> ActivityMonitor {
        ActivityMonitor::spawn(self.inner.auth.clone())
    }

    /// Sign in and establish a session.
    ///
    /// An offline demo sign-in is recorded with the `demo` login method.
    ///
    /// # Errors
    ///
    /// Returns [`AppStateError::SignInBusy`] unless signed out, or the
    /// gateway's error. The session stays signed out on error.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<Degradable<User>, AppStateError> {
        if !self.inner.auth.begin_login().await {
            return Err(AppStateError::SignInBusy);
        }

        match self.inner.gateway.login(username, password).await {
            Ok(result) => {
                let method = if result.is_fallback() { "demo" } else { "password" };
                Ok(self.establish(result, method, remember_me).await)
            }
            Err(e) => {
                self.inner.auth.abort_login().await;
                Err(e.into())
            }
        }
    }

    /// Register an account and sign in with it.
    ///
    /// # Errors
    ///
    /// As for [`AppState::sign_in`].
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn sign_up(
        &self,
        request: &RegisterRequest,
        remember_me: bool,
    ) -> Result<Degradable<User>, AppStateError> {
        if !self.inner.auth.begin_login().await {
            return Err(AppStateError::SignInBusy);
        }

        match self.inner.gateway.register(request).await {
            Ok(result) => Ok(self.establish(result, "register", remember_me).await),
            Err(e) => {
                self.inner.auth.abort_login().await;
                Err(e.into())
            }
        }
    }

    async fn establish(
        &self,
        result: Degradable<User>,
        method: &str,
        remember_me: bool,
    ) -> Degradable<User> {
        let auth = &self.inner.auth;
        match result {
            Ok(user) => Ok(auth.login(user, login_options(method, remember_me)).await),
            Err(fallback) => {
                let reason = fallback.reason;
                let user = auth
                    .login(fallback.value, login_options(method, remember_me))
                    .await;
                Err(Fallback::new(user, reason))
            }
        }
    }

    /// End the session. The backend is told when reachable; the local
    /// session and cart are purged regardless.
    pub async fn sign_out(&self) {
        if let Err(e) = self.inner.gateway.logout().await {
            tracing::debug!(error = %e, "Backend logout failed");
        }
        self.inner.auth.logout().await;
        self.inner.cart.clear().await;
    }

    /// Pick up a session that expired or was revoked by a 401.
    ///
    /// Returns `true` if the session just ended.
    pub async fn sync_session(&self) -> bool {
        let ended = self.inner.auth.check_expiry().await;
        if ended {
            self.inner.cart.clear().await;
        }
        ended
    }

    /// Refresh the signed-in user's profile from the backend.
    ///
    /// # Errors
    ///
    /// Returns the gateway's error when there is no profile to show.
    pub async fn refresh_profile(&self) -> Result<Degradable<User>, AppStateError> {
        let result = self.inner.gateway.get_profile().await;
        if matches!(result, Err(ApiError::Unauthorized(_))) {
            self.sync_session().await;
        }
        let profile = result?;

        if let Ok(live) = &profile {
            self.inner
                .auth
                .update_user(UserUpdate {
                    full_name: Some(live.full_name.clone()),
                    email: live.email.clone(),
                    phone: live.phone.clone(),
                    is_active: Some(live.is_active),
                })
                .await;
        }
        Ok(profile)
    }

    /// Place an order for the current cart.
    ///
    /// # Errors
    ///
    /// See [`CartService::place_order`].
    pub async fn place_order(&self, delivery: &DeliveryInfo) -> Result<PlacedOrder, PlaceOrderError> {
        let result = self
            .inner
            .cart
            .place_order(&self.inner.gateway, delivery)
            .await;
        if matches!(result, Err(PlaceOrderError::Submit(ApiError::Unauthorized(_)))) {
            self.sync_session().await;
        }
        result
    }

    /// Analyse a crop photo and keep it in the scan history.
    ///
    /// # Errors
    ///
    /// Only [`ApiError::Cancelled`]; nothing is recorded in that case.
    pub async fn analyze_crop_image(
        &self,
        image: CropImage,
        crop_type: Option<&str>,
    ) -> Result<Degradable<CropImageAnalysis>, ApiError> {
        let image_name = image.file_name.clone();
        let result = self
            .inner
            .gateway
            .analyze_crop_image(image, crop_type)
            .await?;

        self.inner.scans.record(CropScan::new(
            image_name,
            result.value().clone(),
            result.is_fallback(),
        ));
        Ok(result)
    }
}

fn login_options(method: &str, remember_me: bool) -> LoginOptions {
    LoginOptions {
        remember_me,
        method: method.to_string(),
        ..LoginOptions::default()
    }
}
