//! Marketplace browsing, cart and orders.
//!
//! # Usage
//!
//! ```bash
//! ks-cli products --category vegetables --sort price_low
//! ks-cli cart add 2
//! ks-cli cart show
//! ks-cli checkout --name "Asha" --phone 9876543210 --payment upi
//! ks-cli orders
//! ```

use kisan_setu_client::DegradableExt;
use kisan_setu_client::catalog::RefreshOutcome;
use kisan_setu_core::{DeliveryInfo, PaymentMethod, Product, ProductFilter};

use super::{CommandError, Context, offline_marker, parse_product_id};

/// Delivery details as entered.
pub struct Checkout {
    pub name: String,
    pub phone: String,
    /// `None` means the saved location's city and state.
    pub address: Option<String>,
    pub notes: Option<String>,
    pub payment_method: PaymentMethod,
}

fn print_product(product: &Product) {
    let mut details = Vec::new();
    if let Some(seller) = &product.seller {
        details.push(seller.clone());
    }
    if let Some(location) = &product.location {
        details.push(location.clone());
    }
    if let Some(distance) = product.distance_km {
        details.push(format!("{distance:.0} km"));
    }
    if product.organic {
        details.push("organic".to_string());
    }

    println!(
        "{:>4}  {:<22} {:>6}/kg  {}",
        product.id.to_string(),
        product.name,
        product.price.to_string(),
        details.join(", "),
    );
}

/// List products matching `filter`.
///
/// # Errors
///
/// Only when the request is cancelled; offline data is listed otherwise.
pub async fn products(ctx: &Context, filter: &ProductFilter) -> Result<(), CommandError> {
    let catalog = ctx.state.catalog();
    let offline = match catalog.refresh(ctx.state.gateway(), filter).await? {
        RefreshOutcome::Applied { offline, .. } => offline,
        RefreshOutcome::Stale => catalog.is_offline().await,
    };

    let products = catalog.filtered(filter).await;
    if products.is_empty() {
        println!("No products found{}.", offline_marker(offline));
        return Ok(());
    }

    if filter.category.is_none() {
        let names: Vec<_> = catalog
            .categories()
            .await
            .into_iter()
            .map(|c| c.id)
            .collect();
        println!("Categories: {}", names.join(", "));
    }
    println!("{} products{}", products.len(), offline_marker(offline));
    for product in &products {
        print_product(product);
    }
    Ok(())
}

/// Add one unit of a product to the cart.
///
/// # Errors
///
/// Returns [`CommandError::UnknownProduct`] if the product exists neither on
/// the backend nor in the offline catalog.
pub async fn cart_add(ctx: &Context, raw_id: &str) -> Result<(), CommandError> {
    let id = parse_product_id(raw_id);

    let product = match ctx.state.gateway().get_product(&id).await {
        Ok(product) => product.into_value(),
        Err(e) if e.is_unreachable() || e.status() == Some(404) => {
            tracing::debug!(error = %e, product_id = %id, "Product lookup failed");
            return Err(CommandError::UnknownProduct(raw_id.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let quantity = ctx.state.cart().add_item(&product).await;
    println!("{} × {quantity} in cart", product.name);
    Ok(())
}

/// Remove a product's whole line from the cart.
pub async fn cart_remove(ctx: &Context, raw_id: &str) {
    match ctx.state.cart().remove_item(&parse_product_id(raw_id)).await {
        Some(line) => println!("Removed {} × {}", line.name, line.quantity),
        None => println!("Product {raw_id} is not in the cart."),
    }
}

/// Show the cart with its price breakdown.
pub async fn cart_show(ctx: &Context) {
    let cart = ctx.state.cart();
    let snapshot = cart.snapshot().await;
    if snapshot.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for line in snapshot.lines() {
        println!(
            "{:>4}  {:<22} {:>3} × {:<6} {:>8}",
            line.product_id.to_string(),
            line.name,
            line.quantity,
            line.unit_price.to_string(),
            line.line_total().to_string(),
        );
    }

    let quote = cart.quote().await;
    println!();
    println!("Subtotal:  {}", quote.subtotal);
    if quote.discount.amount() > 0 {
        println!("Discount: -{} (first order)", quote.discount);
    }
    println!("Delivery:  {}", quote.delivery_fee);
    println!("Total:     {}", quote.total);
}

pub async fn cart_clear(ctx: &Context) {
    ctx.state.cart().clear().await;
    println!("Cart cleared.");
}

/// Place an order for the cart.
///
/// # Errors
///
/// Returns [`CommandError::NotSignedIn`] without a session, and
/// [`CommandError::Order`] if the order is invalid or rejected. The cart is
/// kept in both cases.
pub async fn checkout(ctx: &Context, details: Checkout) -> Result<(), CommandError> {
    ctx.require_session().await?;

    let address = match details.address {
        Some(address) => address,
        None => ctx.state.location().current_location().await.short_address(),
    };
    let delivery = DeliveryInfo {
        name: details.name,
        phone: details.phone,
        address,
        notes: details.notes,
        payment_method: details.payment_method,
    };

    let placed = match ctx.state.place_order(&delivery).await {
        Ok(placed) => placed,
        Err(e) => {
            println!("{}", e.user_message(ctx.language()));
            return Err(e.into());
        }
    };

    let confirmation = &placed.confirmation;
    println!(
        "Order {} {}: {}",
        confirmation.order_id, confirmation.status, placed.order.quote.total
    );
    if let Some(message) = &confirmation.message {
        println!("  {message}");
    }
    if let Some(eta) = &confirmation.estimated_delivery {
        println!("  Estimated delivery: {eta}");
    }
    if let Some(impact) = &confirmation.sustainability_impact {
        println!(
            "  Carbon saved: {:.1} kg (sustainability score {:.0})",
            impact.carbon_saved_kg, impact.sustainability_score
        );
    }
    Ok(())
}

/// List orders, from the backend or the local history when offline.
///
/// # Errors
///
/// Returns [`CommandError::NotSignedIn`] without a session.
pub async fn orders(ctx: &Context) -> Result<(), CommandError> {
    ctx.require_session().await?;

    let result = ctx.state.gateway().list_orders().await?;
    let offline = result.is_fallback();
    let orders = result.into_value();

    if orders.is_empty() {
        println!("No orders yet{}.", offline_marker(offline));
        return Ok(());
    }

    println!("{} orders{}", orders.len(), offline_marker(offline));
    for order in &orders {
        println!(
            "{}  {:<10} {:>8}  {}",
            order.placed_on.as_deref().unwrap_or("-"),
            order.status.to_string(),
            order.total.to_string(),
            order.id,
        );
        for item in &order.items {
            println!("    {item}");
        }
    }
    Ok(())
}
