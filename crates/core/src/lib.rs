//! Kisan Setu Core - Shared domain types.
//!
//! This crate provides the types used across all Kisan Setu components:
//! - `client` - State, caching and fallback layer over the Kisan Setu API
//! - `cli` - Command-line front end for farmers, consumers and admins
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! persistence, no HTTP clients. Pricing, cart arithmetic and location math
//! live here so they can be tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - IDs, money, roles, users, locations, carts, orders and products

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
