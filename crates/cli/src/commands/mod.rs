//! Command implementations.
//!
//! Each invocation opens the persisted [`AppState`], restores the session and
//! runs one command against it.

pub mod account;
pub mod advisory;
pub mod market;
pub mod place;

use std::sync::Arc;

use kisan_setu_client::api::{LOGIN_ROUTE, RouteTracker};
use kisan_setu_client::cart::PlaceOrderError;
use kisan_setu_client::state::AppStateError;
use kisan_setu_client::{ApiError, AppState, ClientConfig};
use kisan_setu_core::{Language, LocationError, ProductId};
use thiserror::Error;

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Opening the state or signing in failed.
    #[error("{0}")]
    State(#[from] AppStateError),

    /// A backend call failed with no offline substitute.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// The order was not placed.
    #[error("{0}")]
    Order(#[from] PlaceOrderError),

    #[error("Invalid location: {0}")]
    Location(#[from] LocationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The command needs a session.
    #[error("Not signed in. Run `ks-cli login` first.")]
    NotSignedIn,

    #[error("Unknown product: {0}")]
    UnknownProduct(String),
}

/// One command invocation.
pub struct Context {
    pub state: AppState,
    router: Arc<RouteTracker>,
}

impl Context {
    /// Open the state under `config.data_dir` and restore the session.
    ///
    /// `route` is the screen the command stands in for.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be opened.
    pub async fn open(
        config: ClientConfig,
        route: &str,
        language: Option<Language>,
    ) -> Result<Self, CommandError> {
        let router = Arc::new(RouteTracker::new(route));
        let state = AppState::open(config, router.clone())?;

        state.restore().await;
        if let Some(language) = language {
            state.auth().set_language(language).await;
        }
        if state.auth().is_authenticated().await {
            state.auth().update_activity().await;
        }

        Ok(Self { state, router })
    }

    /// Interface language for user-facing messages.
    pub fn language(&self) -> Language {
        self.state.auth().language()
    }

    /// Fail unless a session is active.
    pub async fn require_session(&self) -> Result<(), CommandError> {
        if self.state.auth().is_authenticated().await {
            Ok(())
        } else {
            Err(CommandError::NotSignedIn)
        }
    }

    /// Report a session the backend revoked during the command.
    pub async fn finish(&self) {
        let ended = self.state.sync_session().await;
        if ended || self.router.redirects().iter().any(|r| r == LOGIN_ROUTE) {
            let message = match self.language() {
                Language::En => "Your session has ended. Please sign in again.",
                Language::Hi => "आपका सत्र समाप्त हो गया है। कृपया फिर से साइन इन करें।",
            };
            println!("{message}");
        }
    }

    #[cfg(test)]
    pub fn current_route(&self) -> String {
        kisan_setu_client::api::Navigator::current_route(self.router.as_ref())
    }
}

/// Parse a product id as typed: digits are numeric ids, anything else text.
pub fn parse_product_id(raw: &str) -> ProductId {
    let raw = raw.trim();
    raw.parse::<i64>()
        .map_or_else(|_| ProductId::from(raw), ProductId::from)
}

/// Suffix marking offline data in listings.
pub const fn offline_marker(offline: bool) -> &'static str {
    if offline { " (offline)" } else { "" }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_product_id() {
        assert_eq!(parse_product_id("42"), ProductId::from(42));
        assert_eq!(parse_product_id(" p-7 "), ProductId::from("p-7"));
    }

    #[tokio::test]
    async fn test_context_starts_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_support::offline_context(dir.path(), "/orders").await;
        assert!(matches!(
            ctx.require_session().await,
            Err(CommandError::NotSignedIn)
        ));
        assert_eq!(ctx.current_route(), "/orders");
        assert_eq!(ctx.language(), Language::En);
    }
}
