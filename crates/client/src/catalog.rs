//! In-memory product catalog.
//!
//! Holds the last product list and categories fetched from the gateway and
//! filters them locally. Refreshes are ticketed: when two overlap, only the
//! most recently started one may replace the catalog.

use std::sync::Arc;

use kisan_setu_core::{Category, Product, ProductFilter, ProductId};
use tokio::sync::RwLock;
use tracing::instrument;

use crate::api::{DegradableExt, Gateway};
use crate::error::ApiResult;
use crate::sequence::{RequestSequencer, Ticket};

/// What a refresh did to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The catalog now holds the fetched data.
    Applied {
        products: usize,
        /// Whether any of it is offline data.
        offline: bool,
    },
    /// A newer refresh started meanwhile; the data was discarded.
    Stale,
}

#[derive(Debug, Default)]
struct CatalogState {
    products: Vec<Product>,
    categories: Vec<Category>,
    offline: bool,
}

/// Shared product catalog. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

#[derive(Debug, Default)]
struct CatalogInner {
    sequencer: RequestSequencer,
    state: RwLock<CatalogState>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch products and categories and install them, unless a newer
    /// refresh has started since.
    ///
    /// `filter` is forwarded to the backend; the catalog still holds
    /// whatever the backend returned, so apply [`Catalog::filtered`] for
    /// display.
    ///
    /// # Errors
    ///
    /// Only [`crate::ApiError::Cancelled`]; offline data is installed
    /// otherwise.
    #[instrument(skip(self, gateway))]
    pub async fn refresh(
        &self,
        gateway: &Gateway,
        filter: &ProductFilter,
    ) -> ApiResult<RefreshOutcome> {
        let ticket = self.inner.sequencer.issue();

        let (products, categories) =
            tokio::try_join!(gateway.list_products(filter), gateway.list_categories())?;
        let offline = products.is_fallback() || categories.is_fallback();

        Ok(self
            .install(ticket, products.into_value(), categories.into_value(), offline)
            .await)
    }

    async fn install(
        &self,
        ticket: Ticket,
        products: Vec<Product>,
        categories: Vec<Category>,
        offline: bool,
    ) -> RefreshOutcome {
        let mut state = self.inner.state.write().await;
        // Checked under the write lock so a stale install cannot interleave
        // with a current one.
        if !self.inner.sequencer.is_current(ticket) {
            tracing::debug!(?ticket, "Discarding stale catalog response");
            return RefreshOutcome::Stale;
        }

        let count = products.len();
        *state = CatalogState {
            products,
            categories,
            offline,
        };
        RefreshOutcome::Applied {
            products: count,
            offline,
        }
    }

    pub async fn products(&self) -> Vec<Product> {
        self.inner.state.read().await.products.clone()
    }

    pub async fn categories(&self) -> Vec<Category> {
        self.inner.state.read().await.categories.clone()
    }

    pub async fn product(&self, id: &ProductId) -> Option<Product> {
        self.inner
            .state
            .read()
            .await
            .products
            .iter()
            .find(|p| &p.id == id)
            .cloned()
    }

    /// Whether the installed data came from the offline shelf.
    pub async fn is_offline(&self) -> bool {
        self.inner.state.read().await.offline
    }

    /// Installed products narrowed and sorted by `filter`.
    pub async fn filtered(&self, filter: &ProductFilter) -> Vec<Product> {
        filter.apply(&self.inner.state.read().await.products)
    }
}
