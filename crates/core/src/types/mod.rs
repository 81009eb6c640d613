//! Core types for Kisan Setu.
//!
//! This module provides type-safe wrappers for the marketplace domain.

pub mod cart;
pub mod catalog;
pub mod id;
pub mod location;
pub mod money;
pub mod order;
pub mod status;
pub mod user;

pub use cart::{Cart, CartLine};
pub use catalog::{Category, Product, ProductFilter, SortKey};
pub use id::*;
pub use location::{Location, LocationError, ReferenceCity};
pub use money::Rupees;
pub use order::{
    CheckoutError, DeliveryInfo, Order, OrderItem, OrderQuote, OrderRequest,
};
pub use status::*;
pub use user::{
    LoginRecord, LoginStats, Preferences, PreferencesUpdate, SessionInfo, SessionUpdate, User,
    UserUpdate,
};
