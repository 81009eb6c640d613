//! Checkout pricing and order snapshots.
//!
//! # Pricing
//!
//! - `subtotal` = cart total
//! - `discount` = 20% of subtotal (rounded) when the buyer has no previous
//!   orders on this device, otherwise 0
//! - `delivery_fee` = ₹50, waived when subtotal exceeds ₹1000
//! - `total` = subtotal - discount + delivery fee

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cart::Cart;
use super::id::{OrderId, ProductId};
use super::money::Rupees;
use super::status::{Language, OrderStatus, PaymentMethod};

/// First-order discount, in percent.
pub const FIRST_ORDER_DISCOUNT_PERCENT: i64 = 20;

/// Flat delivery fee.
pub const DELIVERY_FEE: Rupees = Rupees::new(50);

/// Subtotals strictly above this ship free.
pub const FREE_DELIVERY_THRESHOLD: Rupees = Rupees::new(1000);

/// Reasons a checkout is rejected before anything is sent.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// A required delivery field is blank.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    /// There is nothing to order.
    #[error("cart is empty")]
    EmptyCart,
}

impl CheckoutError {
    /// Message suitable for showing to the buyer.
    #[must_use]
    pub const fn user_message(&self, language: Language) -> &'static str {
        match (self, language) {
            (Self::MissingField(_), Language::En) => "Please fill all required fields",
            (Self::MissingField(_), Language::Hi) => "कृपया सभी आवश्यक फ़ील्ड भरें",
            (Self::EmptyCart, Language::En) => "Your cart is empty",
            (Self::EmptyCart, Language::Hi) => "आपका कार्ट खाली है",
        }
    }
}

/// Delivery details collected at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub name: String,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl DeliveryInfo {
    /// Check that name, phone and address are filled in.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::MissingField`] naming the first blank field.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        for (field, value) in [
            ("name", &self.name),
            ("phone", &self.phone),
            ("address", &self.address),
        ] {
            if value.trim().is_empty() {
                return Err(CheckoutError::MissingField(field));
            }
        }
        Ok(())
    }
}

/// Price breakdown for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQuote {
    pub subtotal: Rupees,
    pub discount: Rupees,
    pub delivery_fee: Rupees,
    pub total: Rupees,
}

impl OrderQuote {
    /// Price a subtotal.
    ///
    /// `first_order` is true when the local order history is empty.
    #[must_use]
    pub fn compute(subtotal: Rupees, first_order: bool) -> Self {
        let discount = if first_order {
            subtotal.percent(FIRST_ORDER_DISCOUNT_PERCENT)
        } else {
            Rupees::ZERO
        };
        let delivery_fee = if subtotal > FREE_DELIVERY_THRESHOLD {
            Rupees::ZERO
        } else {
            DELIVERY_FEE
        };

        Self {
            subtotal,
            discount,
            delivery_fee,
            total: subtotal - discount + delivery_fee,
        }
    }

    /// Price the contents of `cart`.
    #[must_use]
    pub fn for_cart(cart: &Cart, first_order: bool) -> Self {
        Self::compute(cart.total(), first_order)
    }
}

/// One ordered product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price.
    pub price: Rupees,
}

/// Payload submitted to create an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub items: Vec<OrderItem>,
    pub delivery_address: String,
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub payment_method: PaymentMethod,
    #[serde(flatten)]
    pub quote: OrderQuote,
}

impl OrderRequest {
    /// Build a request from a validated cart and delivery details.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] if a required field is blank or the cart
    /// is empty. Field checks run first.
    pub fn build(cart: &Cart, info: &DeliveryInfo, first_order: bool) -> Result<Self, CheckoutError> {
        info.validate()?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let items = cart
            .lines()
            .iter()
            .map(|line| OrderItem {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                price: line.unit_price,
            })
            .collect();

        Ok(Self {
            items,
            delivery_address: info.address.trim().to_string(),
            name: info.name.trim().to_string(),
            phone: info.phone.trim().to_string(),
            notes: info
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            payment_method: info.payment_method,
            quote: OrderQuote::for_cart(cart, first_order),
        })
    }
}

/// An order as placed. Never modified locally after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<OrderItem>,
    pub delivery_address: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub payment_method: PaymentMethod,
    #[serde(flatten)]
    pub quote: OrderQuote,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
}

impl Order {
    /// Snapshot a submitted request under the id the server assigned.
    #[must_use]
    pub fn from_request(
        id: OrderId,
        request: OrderRequest,
        status: OrderStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            items: request.items,
            delivery_address: request.delivery_address,
            name: request.name,
            phone: request.phone,
            notes: request.notes,
            payment_method: request.payment_method,
            quote: request.quote,
            created_at,
            status,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::catalog::Product;

    fn cart_with(price: i64, quantity: u32) -> Cart {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": 1, "name": "Organic Wheat", "price": price
        }))
        .unwrap();
        let mut cart = Cart::new();
        for _ in 0..quantity {
            cart.add(&product);
        }
        cart
    }

    fn info() -> DeliveryInfo {
        DeliveryInfo {
            name: "Ram Singh".to_string(),
            phone: "9876543210".to_string(),
            address: "Ludhiana, Punjab".to_string(),
            notes: None,
            payment_method: PaymentMethod::CashOnDelivery,
        }
    }

    #[test]
    fn test_first_order_example() {
        // 25 × 2 = 50, first order: 10 off, 50 delivery.
        let quote = OrderQuote::for_cart(&cart_with(25, 2), true);
        assert_eq!(quote.subtotal, Rupees::new(50));
        assert_eq!(quote.discount, Rupees::new(10));
        assert_eq!(quote.delivery_fee, Rupees::new(50));
        assert_eq!(quote.total, Rupees::new(90));
    }

    #[test]
    fn test_returning_buyer_gets_no_discount() {
        let quote = OrderQuote::compute(Rupees::new(50), false);
        assert_eq!(quote.discount, Rupees::ZERO);
        assert_eq!(quote.total, Rupees::new(100));
    }

    #[test]
    fn test_discount_rounds() {
        assert_eq!(OrderQuote::compute(Rupees::new(57), true).discount, Rupees::new(11));
        assert_eq!(OrderQuote::compute(Rupees::new(58), true).discount, Rupees::new(12));
    }

    #[test]
    fn test_delivery_fee_threshold_is_strict() {
        assert_eq!(
            OrderQuote::compute(Rupees::new(1000), false).delivery_fee,
            DELIVERY_FEE
        );
        assert_eq!(
            OrderQuote::compute(Rupees::new(1001), false).delivery_fee,
            Rupees::ZERO
        );
    }

    #[test]
    fn test_missing_fields_reported_in_order() {
        let mut blank = info();
        blank.phone = "   ".to_string();
        blank.address = String::new();
        assert_eq!(blank.validate(), Err(CheckoutError::MissingField("phone")));
    }

    #[test]
    fn test_build_rejects_empty_cart() {
        assert_eq!(
            OrderRequest::build(&Cart::new(), &info(), true),
            Err(CheckoutError::EmptyCart)
        );
    }

    #[test]
    fn test_build_request_payload() {
        let mut details = info();
        details.notes = Some("  ".to_string());
        let request = OrderRequest::build(&cart_with(25, 2), &details, true).unwrap();
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].quantity, 2);
        assert_eq!(request.items[0].price, Rupees::new(25));
        assert!(request.notes.is_none());

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["total"], 90);
        assert_eq!(json["delivery_address"], "Ludhiana, Punjab");
        assert_eq!(json["items"][0]["product_id"], 1);
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            CheckoutError::EmptyCart.user_message(Language::En),
            "Your cart is empty"
        );
    }
}
