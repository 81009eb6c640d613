//! `/api/marketplace` routes.

use kisan_setu_core::{Category, Order, OrderRequest, Product, ProductFilter, ProductId};
use reqwest::Method;
use tracing::instrument;

use super::types::{CategoryList, OrderConfirmation, OrderList, OrderSummary, ProductPage, ProductQuery};
use super::{Degradable, Fallback, Gateway, degrade, mock};
use crate::error::{ApiError, ApiResult};
use crate::store::keys;

impl Gateway {
    /// List products matching `filter`.
    ///
    /// Offline, the static shelf is filtered locally instead.
    ///
    /// # Errors
    ///
    /// Only [`ApiError::Cancelled`].
    #[instrument(skip(self))]
    pub async fn list_products(&self, filter: &ProductFilter) -> ApiResult<Degradable<Vec<Product>>> {
        let request = self
            .request(Method::GET, "/api/marketplace/products")
            .query(&ProductQuery::from(filter));
        let result = self
            .execute::<ProductPage>(request)
            .await
            .map(|page| page.products);

        degrade("list_products", result, || filter.apply(&mock::products()))
    }

    /// Fetch one product.
    ///
    /// # Errors
    ///
    /// Returns the call's error when the product is not on the offline
    /// shelf either.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &ProductId) -> ApiResult<Degradable<Product>> {
        let result = self
            .execute::<Product>(self.request(Method::GET, &format!("/api/marketplace/products/{id}")))
            .await;

        match result {
            Ok(product) => Ok(Ok(product)),
            Err(ApiError::Cancelled) => Err(ApiError::Cancelled),
            Err(e) => match mock::product_by_id(id) {
                Some(product) => {
                    tracing::warn!(error = %e, "Product unavailable, serving offline copy");
                    Ok(Err(Fallback::new(product, e.to_string())))
                }
                None => Err(e),
            },
        }
    }

    /// List product categories.
    ///
    /// # Errors
    ///
    /// Only [`ApiError::Cancelled`].
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> ApiResult<Degradable<Vec<Category>>> {
        let result = self
            .execute::<CategoryList>(self.request(Method::GET, "/api/marketplace/categories"))
            .await
            .map(|list| list.categories);

        degrade("list_categories", result, mock::categories)
    }

    /// Submit an order.
    ///
    /// There is no offline substitute: a confirmation is only ever reported
    /// for an order the backend accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self, order), fields(items = order.items.len(), total = %order.quote.total))]
    pub async fn create_order(&self, order: &OrderRequest) -> ApiResult<OrderConfirmation> {
        let confirmation: OrderConfirmation = self
            .execute(
                self.request(Method::POST, "/api/marketplace/orders")
                    .json(order),
            )
            .await?;

        tracing::info!(order_id = %confirmation.order_id, "Order placed");
        Ok(confirmation)
    }

    /// List the signed-in user's orders.
    ///
    /// Offline, orders placed from this device are listed instead.
    ///
    /// # Errors
    ///
    /// Only [`ApiError::Cancelled`].
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> ApiResult<Degradable<Vec<OrderSummary>>> {
        let result = self
            .execute::<OrderList>(self.request(Method::GET, "/api/marketplace/orders"))
            .await
            .map(|list| list.orders);

        degrade("list_orders", result, || {
            self.store()
                .get::<Vec<Order>>(keys::ORDER_HISTORY)
                .unwrap_or_default()
                .iter()
                .map(OrderSummary::from)
                .collect()
        })
    }
}
