//! Kisan Setu backend gateway.
//!
//! One [`Gateway`] owns the HTTP client for the whole app. It attaches the
//! stored bearer token to every request, purges the session on HTTP 401 and,
//! for endpoints that have one, substitutes offline data when a call fails.
//! Substituted data is always marked as such ([`Fallback`]).
//!
//! Endpoints are grouped by backend router:
//! - `auth` - sign-in, registration, profile, user management
//! - `marketplace` - products, categories, orders
//! - `advisory` - crop health, weather advisory, recommendations
//! - `admin` - platform statistics and location services

mod admin;
mod advisory;
mod auth;
mod fallback;
mod marketplace;
pub mod mock;
mod navigation;
pub mod types;

use std::sync::Arc;

use kisan_setu_core::User;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::store::{Store, keys};

pub use admin::DEFAULT_NEARBY_RADIUS_KM;
pub use advisory::CropImage;
pub use fallback::{Degradable, DegradableExt, Fallback};
pub use navigation::{
    LOGIN_ROUTE, Navigator, REGISTER_ROUTE, RouteTracker, should_redirect_to_login,
};

/// Longest slice of a response body written to logs.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// Gateway
// =============================================================================

/// Client for the Kisan Setu REST API.
///
/// Cheap to clone; clones share the HTTP connection pool, the store and the
/// navigator. See [`Gateway::with_cancellation`] for aborting calls.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
    cancel: CancellationToken,
}

struct GatewayInner {
    client: reqwest::Client,
    base_url: String,
    store: Store,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.inner.base_url)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// `{"detail": ...}` error body produced by the backend.
#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl Gateway {
    /// Create a gateway for `config.api_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend
    /// initialisation failure).
    pub fn new(
        config: &ClientConfig,
        store: Store,
        navigator: Arc<dyn Navigator>,
    ) -> ApiResult<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout)
            .build()
            .map_err(ApiError::Http)?;

        Ok(Self {
            inner: Arc::new(GatewayInner {
                client,
                base_url: config.api_url.trim_end_matches('/').to_string(),
                store,
                navigator,
            }),
            cancel: CancellationToken::new(),
        })
    }

    /// A handle whose calls are aborted when `token` is cancelled.
    ///
    /// Aborted calls return [`ApiError::Cancelled`] and have no side effects
    /// (no session purge, no persistence).
    #[must_use]
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cancel: token,
        }
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub(crate) fn store(&self) -> &Store {
        &self.inner.store
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Start a request to `path`, authenticated as the stored user if any.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.inner.client.request(method, self.url(path));
        match self
            .inner
            .store
            .get::<User>(keys::CURRENT_USER)
            .and_then(|user| user.access_token)
        {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Start a request that skips the stored token.
    fn anonymous(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner.client.request(method, self.url(path))
    }

    /// Send `request` and decode a JSON body, racing the cancellation token.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ApiError::Cancelled),
            result = self.send(request) => result,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            let detail = error_detail(&response_text)
                .unwrap_or_else(|| "Could not validate credentials".to_string());
            self.handle_unauthorized();
            return Err(ApiError::Unauthorized(detail));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %truncate(&response_text),
                "Kisan Setu API returned non-success status"
            );
            let detail = error_detail(&response_text).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
            return Err(ApiError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        // Some routes answer with an empty body.
        let body = if response_text.trim().is_empty() {
            "null"
        } else {
            response_text.as_str()
        };

        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&response_text),
                "Failed to parse Kisan Setu API response"
            );
            ApiError::Parse(e.to_string())
        })
    }

    /// Purge the stored user and send the front end to the login page.
    fn handle_unauthorized(&self) {
        self.inner.store.remove(keys::CURRENT_USER);

        let route = self.inner.navigator.current_route();
        if should_redirect_to_login(&route) {
            tracing::info!(from = %route, "Session rejected, redirecting to login");
            self.inner.navigator.navigate(LOGIN_ROUTE);
        }
    }
}

/// Wrap a call result with an offline substitute.
///
/// Success passes through and cancellation stays an error. Every other
/// failure is logged and replaced by `fallback()`.
fn degrade<T>(
    endpoint: &'static str,
    result: ApiResult<T>,
    fallback: impl FnOnce() -> T,
) -> ApiResult<Degradable<T>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(ApiError::Cancelled) => Err(ApiError::Cancelled),
        Err(e) => {
            tracing::warn!(endpoint, error = %e, "Backend call failed, serving offline data");
            Ok(Err(Fallback::new(fallback(), e.to_string())))
        }
    }
}

/// The `detail` field of an error body, rendered as text.
fn error_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_variants() {
        assert_eq!(
            error_detail(r#"{"detail": "Username already registered"}"#).as_deref(),
            Some("Username already registered")
        );
        assert_eq!(
            error_detail(r#"{"detail": [{"loc": ["body"], "msg": "field required"}]}"#).as_deref(),
            Some(r#"[{"loc":["body"],"msg":"field required"}]"#)
        );
        assert!(error_detail("Internal Server Error").is_none());
        assert!(error_detail(r#"{"detail": null}"#).is_none());
    }

    #[test]
    fn test_degrade_passes_cancellation_through() {
        let result: ApiResult<Degradable<u8>> = degrade("test", Err(ApiError::Cancelled), || 0);
        assert!(matches!(result, Err(ApiError::Cancelled)));
    }

    #[test]
    fn test_degrade_substitutes_on_failure() {
        let result = degrade(
            "test",
            Err(ApiError::Api {
                status: 500,
                detail: "boom".to_string(),
            }),
            || 7,
        )
        .unwrap();
        assert!(result.is_fallback());
        assert_eq!(result.into_value(), 7);
    }

    #[test]
    fn test_degrade_keeps_live_value() {
        let result = degrade("test", Ok(3), || 7).unwrap();
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let config = ClientConfig {
            api_url: "http://localhost:8001/".to_string(),
            ..ClientConfig::default()
        };
        let gateway = Gateway::new(
            &config,
            Store::in_memory(),
            Arc::new(RouteTracker::default()),
        )
        .unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:8001");
        assert_eq!(gateway.url("/auth/login"), "http://localhost:8001/auth/login");
    }
}
