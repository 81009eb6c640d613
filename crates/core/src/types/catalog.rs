//! Marketplace products and in-memory filtering.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::money::Rupees;

/// A product listed on the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Price per unit (usually per kg).
    pub price: Rupees,
    #[serde(default)]
    pub category: String,
    #[serde(default, alias = "seller_name")]
    pub seller: Option<String>,
    /// Where the seller is based.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub sustainability_score: Option<u8>,
    /// Kilograms of CO2 per unit.
    #[serde(default)]
    pub carbon_footprint: Option<f64>,
    #[serde(default)]
    pub organic: bool,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default, alias = "quantity_available")]
    pub quantity_kg: Option<u32>,
    #[serde(default, alias = "image_url")]
    pub image: Option<String>,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    PriceLow,
    PriceHigh,
    Distance,
    Sustainability,
    Rating,
}

impl SortKey {
    /// Query-string value understood by the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::PriceLow => "price_low",
            Self::PriceHigh => "price_high",
            Self::Distance => "distance",
            Self::Sustainability => "sustainability",
            Self::Rating => "rating",
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "price_low" | "price" => Ok(Self::PriceLow),
            "price_high" => Ok(Self::PriceHigh),
            "distance" => Ok(Self::Distance),
            "sustainability" => Ok(Self::Sustainability),
            "rating" => Ok(Self::Rating),
            _ => Err(format!("invalid sort key: {s}")),
        }
    }
}

/// Criteria for narrowing a product list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub category: Option<String>,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    pub organic_only: bool,
    pub max_distance_km: Option<f64>,
    pub min_sustainability: Option<u8>,
    pub sort: SortKey,
}

impl ProductFilter {
    /// Whether `product` satisfies every criterion.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category.as_deref()
            && !category.is_empty()
            && product.category != category
        {
            return false;
        }

        if let Some(term) = self.search.as_deref()
            && !term.is_empty()
            && !product.name.to_lowercase().contains(&term.to_lowercase())
        {
            return false;
        }

        if self.organic_only && !product.organic {
            return false;
        }

        // Products without a distance cannot be shown to satisfy a radius.
        if let Some(max) = self.max_distance_km
            && product.distance_km.is_none_or(|d| d > max)
        {
            return false;
        }

        if let Some(min) = self.min_sustainability
            && product.sustainability_score.is_none_or(|s| s < min)
        {
            return false;
        }

        true
    }

    /// Filter and sort `products`.
    #[must_use]
    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        let mut selected: Vec<Product> = products
            .iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();

        match self.sort {
            SortKey::Name => selected.sort_by(|a, b| a.name.cmp(&b.name)),
            SortKey::PriceLow => selected.sort_by_key(|p| p.price),
            SortKey::PriceHigh => selected.sort_by_key(|p| std::cmp::Reverse(p.price)),
            SortKey::Distance => selected.sort_by(|a, b| {
                a.distance_km
                    .unwrap_or(f64::INFINITY)
                    .total_cmp(&b.distance_km.unwrap_or(f64::INFINITY))
            }),
            SortKey::Sustainability => {
                selected.sort_by_key(|p| std::cmp::Reverse(p.sustainability_score.unwrap_or(0)));
            }
            SortKey::Rating => selected.sort_by(|a, b| {
                b.rating
                    .unwrap_or(0.0)
                    .total_cmp(&a.rating.unwrap_or(0.0))
            }),
        }

        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, name: &str, price: i64, category: &str) -> Product {
        Product {
            id: ProductId::from(id),
            name: name.to_string(),
            price: Rupees::new(price),
            category: category.to_string(),
            seller: None,
            location: None,
            distance_km: None,
            sustainability_score: None,
            carbon_footprint: None,
            organic: false,
            rating: None,
            quantity_kg: None,
            image: None,
        }
    }

    fn shelf() -> Vec<Product> {
        let mut wheat = product(1, "Organic Wheat", 25, "grains");
        wheat.organic = true;
        wheat.distance_km = Some(15.0);
        wheat.rating = Some(4.8);
        let mut tomatoes = product(2, "Fresh Tomatoes", 30, "vegetables");
        tomatoes.distance_km = Some(8.0);
        tomatoes.rating = Some(4.5);
        let mut rice = product(3, "Basmati Rice", 80, "grains");
        rice.organic = true;
        rice.distance_km = Some(25.0);
        rice.rating = Some(4.9);
        vec![wheat, tomatoes, rice]
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_default_filter_sorts_by_name() {
        let out = ProductFilter::default().apply(&shelf());
        assert_eq!(
            names(&out),
            ["Basmati Rice", "Fresh Tomatoes", "Organic Wheat"]
        );
    }

    #[test]
    fn test_category_and_search() {
        let filter = ProductFilter {
            category: Some("grains".to_string()),
            search: Some("WHEAT".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(names(&filter.apply(&shelf())), ["Organic Wheat"]);
    }

    #[test]
    fn test_empty_category_matches_all() {
        let filter = ProductFilter {
            category: Some(String::new()),
            ..ProductFilter::default()
        };
        assert_eq!(filter.apply(&shelf()).len(), 3);
    }

    #[test]
    fn test_organic_and_distance() {
        let filter = ProductFilter {
            organic_only: true,
            max_distance_km: Some(20.0),
            ..ProductFilter::default()
        };
        assert_eq!(names(&filter.apply(&shelf())), ["Organic Wheat"]);
    }

    #[test]
    fn test_sort_orders() {
        let by = |sort| {
            ProductFilter {
                sort,
                ..ProductFilter::default()
            }
            .apply(&shelf())
            .into_iter()
            .map(|p| p.id.to_string())
            .collect::<Vec<_>>()
        };
        assert_eq!(by(SortKey::PriceLow), ["1", "2", "3"]);
        assert_eq!(by(SortKey::PriceHigh), ["3", "2", "1"]);
        assert_eq!(by(SortKey::Distance), ["2", "1", "3"]);
        assert_eq!(by(SortKey::Rating), ["3", "1", "2"]);
    }
}
