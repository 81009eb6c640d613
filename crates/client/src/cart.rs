//! Persistent cart and checkout.
//!
//! The cart is written back to the store after every change, so it survives
//! restarts. Checkout holds the cart lock for the whole submission: items
//! added while an order is in flight land in the next cart, never in a
//! half-cleared one.

use std::sync::Arc;

use chrono::Utc;
use kisan_setu_core::{
    Cart, CartLine, CheckoutError, DeliveryInfo, Language, Order, OrderQuote, OrderRequest,
    Product, ProductId, Rupees,
};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::api::Gateway;
use crate::api::types::OrderConfirmation;
use crate::error::ApiError;
use crate::store::{Store, keys};

/// Why an order was not placed. The cart is unchanged in every case.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// Rejected before submission.
    #[error(transparent)]
    Invalid(#[from] CheckoutError),

    /// The backend did not accept the order.
    #[error("order submission failed: {0}")]
    Submit(#[from] ApiError),
}

impl PlaceOrderError {
    /// Message suitable for showing to the buyer.
    #[must_use]
    pub fn user_message(&self, language: Language) -> String {
        match (self, language) {
            (Self::Invalid(e), _) => e.user_message(language).to_string(),
            (Self::Submit(e @ (ApiError::Api { .. } | ApiError::Unauthorized(_))), _) => {
                e.user_message(language)
            }
            (Self::Submit(_), Language::En) => "Failed to place order. Please try again.".to_string(),
            (Self::Submit(_), Language::Hi) => {
                "ऑर्डर देने में विफल। कृपया पुनः प्रयास करें।".to_string()
            }
        }
    }
}

/// An order the backend accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    /// The local snapshot appended to the order history.
    pub order: Order,
    pub confirmation: OrderConfirmation,
}

/// The buyer's cart, backed by the store.
#[derive(Clone)]
pub struct CartService {
    inner: Arc<CartInner>,
}

struct CartInner {
    store: Store,
    cart: Mutex<Cart>,
}

impl std::fmt::Debug for CartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartService").finish_non_exhaustive()
    }
}

impl CartService {
    /// Load the persisted cart, or start empty.
    #[must_use]
    pub fn new(store: Store) -> Self {
        let cart = Self::load(&store);

        Self {
            inner: Arc::new(CartInner {
                store,
                cart: Mutex::new(cart),
            }),
        }
    }

    /// Replace the in-memory cart with what the store holds now.
    ///
    /// Needed after something else purged or rewrote the persisted cart,
    /// such as an expired session being cleared at startup.
    pub async fn reload(&self) {
        let mut cart = self.inner.cart.lock().await;
        *cart = Self::load(&self.inner.store);
    }

    fn load(store: &Store) -> Cart {
        store
            .get::<Vec<CartLine>>(keys::CART)
            .map(Cart::from_lines)
            .unwrap_or_default()
    }

    fn persist(&self, cart: &Cart) {
        self.inner.store.set(keys::CART, cart);
    }

    /// A copy of the current cart.
    pub async fn snapshot(&self) -> Cart {
        self.inner.cart.lock().await.clone()
    }

    /// Add one unit of `product`. Returns its new quantity.
    pub async fn add_item(&self, product: &Product) -> u32 {
        let mut cart = self.inner.cart.lock().await;
        let quantity = cart.add(product);
        self.persist(&cart);
        quantity
    }

    /// Drop the whole line for `product_id`.
    pub async fn remove_item(&self, product_id: &ProductId) -> Option<CartLine> {
        let mut cart = self.inner.cart.lock().await;
        let removed = cart.remove(product_id);
        if removed.is_some() {
            self.persist(&cart);
        }
        removed
    }

    pub async fn clear(&self) {
        self.inner.cart.lock().await.clear();
        self.inner.store.remove(keys::CART);
    }

    pub async fn total(&self) -> Rupees {
        self.inner.cart.lock().await.total()
    }

    pub async fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.inner.cart.lock().await.quantity_of(product_id)
    }

    /// Number of distinct products.
    pub async fn line_count(&self) -> usize {
        self.inner.cart.lock().await.lines().len()
    }

    /// Orders placed from this device, oldest first.
    #[must_use]
    pub fn order_history(&self) -> Vec<Order> {
        self.inner
            .store
            .get(keys::ORDER_HISTORY)
            .unwrap_or_default()
    }

    /// Whether the next order qualifies for the first-order discount.
    #[must_use]
    pub fn is_first_order(&self) -> bool {
        self.order_history().is_empty()
    }

    /// Price the current cart without submitting anything.
    pub async fn quote(&self) -> OrderQuote {
        let cart = self.inner.cart.lock().await;
        OrderQuote::for_cart(&cart, self.is_first_order())
    }

    /// Validate, submit and record an order for the current cart.
    ///
    /// On success the cart is cleared and the order appended to the local
    /// history. On any error nothing changes.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceOrderError::Invalid`] before any network call when a
    /// delivery field is blank or the cart is empty, and
    /// [`PlaceOrderError::Submit`] when the backend rejects or cannot
    /// receive the order.
    pub async fn place_order(
        &self,
        gateway: &Gateway,
        delivery: &DeliveryInfo,
    ) -> Result<PlacedOrder, PlaceOrderError> {
        let mut cart = self.inner.cart.lock().await;
        let mut history = self.order_history();

        let request = OrderRequest::build(&cart, delivery, history.is_empty())?;
        let confirmation = gateway.create_order(&request).await?;

        let order = Order::from_request(
            confirmation.order_id.clone(),
            request,
            confirmation.status,
            Utc::now(),
        );
        history.push(order.clone());
        self.inner.store.set(keys::ORDER_HISTORY, &history);

        cart.clear();
        self.inner.store.remove(keys::CART);

        Ok(PlacedOrder {
            order,
            confirmation,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use kisan_setu_core::Rupees;

    use super::*;
    use crate::api::RouteTracker;
    use crate::config::ClientConfig;

    fn product(id: i64, price: i64) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id, "name": format!("Product {id}"), "price": price
        }))
        .unwrap()
    }

    fn offline_gateway(store: Store) -> Gateway {
        let config = ClientConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            ..ClientConfig::default()
        };
        Gateway::new(&config, store, Arc::new(RouteTracker::default())).unwrap()
    }

    #[tokio::test]
    async fn test_cart_survives_reload() {
        let store = Store::in_memory();
        let cart = CartService::new(store.clone());
        cart.add_item(&product(1, 25)).await;
        cart.add_item(&product(1, 25)).await;
        cart.add_item(&product(2, 30)).await;

        let reloaded = CartService::new(store);
        assert_eq!(reloaded.quantity_of(&ProductId::from(1)).await, 2);
        assert_eq!(reloaded.line_count().await, 2);
        assert_eq!(reloaded.total().await, Rupees::new(80));
    }

    #[tokio::test]
    async fn test_reload_follows_purged_store() {
        let store = Store::in_memory();
        let cart = CartService::new(store.clone());
        cart.add_item(&product(1, 25)).await;
        assert_eq!(cart.line_count().await, 1);

        store.remove(keys::CART);
        cart.reload().await;
        assert_eq!(cart.line_count().await, 0);

        // A later write must not resurrect the purged line
        cart.add_item(&product(2, 30)).await;
        assert_eq!(CartService::new(store).line_count().await, 1);
    }

    #[tokio::test]
    async fn test_remove_drops_whole_line() {
        let cart = CartService::new(Store::in_memory());
        cart.add_item(&product(1, 25)).await;
        cart.add_item(&product(1, 25)).await;
        let removed = cart.remove_item(&ProductId::from(1)).await.unwrap();
        assert_eq!(removed.quantity, 2);
        assert_eq!(cart.total().await, Rupees::ZERO);
        assert!(cart.remove_item(&ProductId::from(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_first_order_quote() {
        let cart = CartService::new(Store::in_memory());
        cart.add_item(&product(1, 25)).await;
        cart.add_item(&product(1, 25)).await;

        let quote = cart.quote().await;
        assert_eq!(quote.subtotal, Rupees::new(50));
        assert_eq!(quote.discount, Rupees::new(10));
        assert_eq!(quote.delivery_fee, Rupees::new(50));
        assert_eq!(quote.total, Rupees::new(90));
    }

    #[tokio::test]
    async fn test_invalid_checkout_changes_nothing() {
        let store = Store::in_memory();
        let cart = CartService::new(store.clone());
        cart.add_item(&product(1, 25)).await;
        let gateway = offline_gateway(store.clone());

        let err = cart
            .place_order(&gateway, &DeliveryInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PlaceOrderError::Invalid(CheckoutError::MissingField(_))));
        assert_eq!(
            err.user_message(Language::En),
            "Please fill all required fields"
        );
        assert_eq!(cart.line_count().await, 1);
        assert!(cart.order_history().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let store = Store::in_memory();
        let cart = CartService::new(store.clone());
        let delivery = DeliveryInfo {
            name: "Asha".to_string(),
            phone: "9876543210".to_string(),
            address: "12 Mandi Road".to_string(),
            ..DeliveryInfo::default()
        };
        let err = cart
            .place_order(&offline_gateway(store), &delivery)
            .await
            .unwrap_err();
        assert!(matches!(err, PlaceOrderError::Invalid(CheckoutError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_keeps_cart() {
        let store = Store::in_memory();
        let cart = CartService::new(store.clone());
        cart.add_item(&product(1, 25)).await;
        let delivery = DeliveryInfo {
            name: "Asha".to_string(),
            phone: "9876543210".to_string(),
            address: "12 Mandi Road".to_string(),
            ..DeliveryInfo::default()
        };

        let err = cart
            .place_order(&offline_gateway(store), &delivery)
            .await
            .unwrap_err();
        assert!(matches!(err, PlaceOrderError::Submit(_)));
        assert_eq!(
            err.user_message(Language::En),
            "Failed to place order. Please try again."
        );
        assert_eq!(cart.line_count().await, 1);
        assert!(cart.is_first_order());
    }
}
