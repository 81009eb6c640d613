//! Kisan Setu client library.
//!
//! Client-side state, caching and offline fallbacks for the Kisan Setu
//! marketplace and advisory backend.
//!
//! # Architecture
//!
//! - [`store`] - Versioned key/value persistence (file or memory backed)
//! - [`location`] - Location resolution: cache, IP lookup, then a fixed fallback
//! - [`session`] - Authentication state, token expiry, preferences and activity
//! - [`cart`] - Persisted cart and checkout
//! - [`api`] - HTTP gateway to the backend with per-endpoint fallbacks
//! - [`weather`] - OpenWeatherMap client that never fails
//! - [`catalog`] - In-memory product list with stale-response protection
//! - [`state`] - [`AppState`], the root object owning all of the above
//!
//! # Degraded mode
//!
//! Endpoints with an offline fallback return [`Degradable<T>`], an alias for
//! `Result<T, Fallback<T>>`. `Ok` carries live data; `Err` carries synthetic
//! data plus the reason the live call failed. Both arms hold a usable value.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod location;
pub mod scans;
pub mod sequence;
pub mod session;
pub mod state;
pub mod store;
pub mod weather;

pub use api::{Degradable, DegradableExt, Fallback, Gateway};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, ApiResult};
pub use state::AppState;
pub use store::Store;
