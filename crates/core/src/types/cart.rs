//! Shopping cart.
//!
//! A cart holds at most one line per product. Adding a product that is
//! already present bumps its quantity; removing a product drops the whole
//! line, whatever its quantity.

use serde::{Deserialize, Serialize};

use super::catalog::Product;
use super::id::ProductId;
use super::money::Rupees;

/// A single line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(alias = "id")]
    pub product_id: ProductId,
    pub name: String,
    /// Unit price at the time the product was added.
    #[serde(alias = "price")]
    pub unit_price: Rupees,
    pub quantity: u32,
    #[serde(default)]
    pub seller: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl CartLine {
    /// Line total (`unit_price × quantity`).
    #[must_use]
    pub fn line_total(&self) -> Rupees {
        self.unit_price * self.quantity
    }
}

impl From<&Product> for CartLine {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity: 1,
            seller: product.seller.clone(),
            location: product.location.clone(),
        }
    }
}

/// An ordered list of cart lines, unique by product id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Rebuild a cart from persisted lines.
    ///
    /// Duplicate product ids are merged into the first occurrence and
    /// zero-quantity lines are dropped, so a hand-edited or legacy blob still
    /// yields a valid cart.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            if let Some(existing) = cart.line_mut(&line.product_id) {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
            } else {
                cart.lines.push(line);
            }
        }
        cart
    }

    /// Add one unit of `product`.
    ///
    /// Returns the new quantity for that product.
    pub fn add(&mut self, product: &Product) -> u32 {
        if let Some(line) = self.line_mut(&product.id) {
            line.quantity = line.quantity.saturating_add(1);
            return line.quantity;
        }
        self.lines.push(CartLine::from(product));
        1
    }

    /// Remove the line for `product_id` entirely.
    ///
    /// Returns the removed line, if any.
    pub fn remove(&mut self, product_id: &ProductId) -> Option<CartLine> {
        let index = self
            .lines
            .iter()
            .position(|line| &line.product_id == product_id)?;
        Some(self.lines.remove(index))
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of `unit_price × quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Rupees {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Quantity of `product_id` in the cart (0 if absent).
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.lines
            .iter()
            .find(|line| &line.product_id == product_id)
            .map_or(0, |line| line.quantity)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// The lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| &line.product_id == product_id)
    }
}
