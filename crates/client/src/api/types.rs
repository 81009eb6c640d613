//! Request and response bodies for the Kisan Setu backend.
//!
//! Response types are lenient: unknown fields are ignored and most fields
//! default, because the backend has shipped several shapes for the same
//! route.

use kisan_setu_core::{
    Category, Order, OrderId, OrderStatus, Product, ProductFilter, Role, Rupees, Season, User,
    UserId,
};
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Auth
// =============================================================================

/// `POST /auth/login` response.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
}

fn bearer() -> String {
    "bearer".to_string()
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// `POST /auth/register` body.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub user_type: Role,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("full_name", &self.full_name)
            .field("phone", &self.phone)
            .field("user_type", &self.user_type)
            .finish()
    }
}

/// `POST /auth/register` response.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub username: String,
}

/// Generic `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Marketplace
// =============================================================================

/// Query string for `GET /api/marketplace/products`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub organic_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f64>,
    pub sort_by: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_sustainability: Option<u8>,
}

impl From<&ProductFilter> for ProductQuery {
    fn from(filter: &ProductFilter) -> Self {
        let non_empty = |s: &Option<String>| s.clone().filter(|v| !v.trim().is_empty());
        Self {
            category: non_empty(&filter.category),
            search: non_empty(&filter.search),
            organic_only: filter.organic_only,
            max_distance: filter.max_distance_km,
            sort_by: filter.sort.as_str(),
            min_sustainability: filter.min_sustainability,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProductPage {
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CategoryList {
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// Environmental summary attached to a confirmed order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SustainabilityImpact {
    pub carbon_footprint_kg: f64,
    pub carbon_saved_kg: f64,
    pub avg_distance_km: f64,
    pub organic_percentage: f64,
    pub sustainability_score: f64,
}

/// `POST /api/marketplace/orders` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: OrderId,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub estimated_delivery: Option<String>,
    #[serde(default)]
    pub sustainability_impact: Option<SustainabilityImpact>,
}

/// One row of `GET /api/marketplace/orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    /// Date the order was placed, as reported.
    #[serde(default, alias = "date", alias = "created_at")]
    pub placed_on: Option<String>,
    pub total: Rupees,
    #[serde(default)]
    pub status: OrderStatus,
    /// Human-readable item descriptions.
    #[serde(default, deserialize_with = "item_descriptions")]
    pub items: Vec<String>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            placed_on: Some(order.created_at.format("%Y-%m-%d").to_string()),
            total: order.quote.total,
            status: order.status,
            items: order
                .items
                .iter()
                .map(|item| format!("#{} × {}", item.product_id, item.quantity))
                .collect(),
        }
    }
}

/// Items arrive as strings or as `{product_id, quantity}` objects.
fn item_descriptions<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|item| match item {
            serde_json::Value::String(s) => s,
            serde_json::Value::Object(map) => {
                let name = map
                    .get("name")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
                    .or_else(|| map.get("product_id").map(|id| format!("#{id}")))
                    .unwrap_or_else(|| "item".to_string());
                match map.get("quantity").and_then(serde_json::Value::as_u64) {
                    Some(quantity) => format!("{name} × {quantity}"),
                    None => name,
                }
            }
            other => other.to_string(),
        })
        .collect())
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OrderList {
    #[serde(default)]
    pub orders: Vec<OrderSummary>,
}

// =============================================================================
// Advisory
// =============================================================================

/// Query for `POST /api/advisory/predict`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CropHealthQuery {
    pub crop: String,
    pub season: Season,
    pub soil_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,
}

/// Crop health prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropHealthPrediction {
    #[serde(alias = "crop_name")]
    pub crop: String,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub soil_type: Option<String>,
    #[serde(default)]
    pub health_score: Option<u8>,
    #[serde(alias = "prediction")]
    pub status: String,
    #[serde(default, alias = "next_steps")]
    pub recommendations: Vec<String>,
    /// Either a 0–1 fraction or a 0–100 percentage, as reported.
    #[serde(default)]
    pub confidence: f64,
}

/// Readings inside a weather advisory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryWeather {
    pub city: String,
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
    pub wind_speed: f64,
}

/// `GET /api/advisory/weather` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherAdvisory {
    pub weather: AdvisoryWeather,
    pub advisory: Vec<String>,
    pub farming_tips: Vec<String>,
}

/// Accepts the nested shape above as well as the flat
/// `{city, temperature, ..., farming_advice}` body some backends return.
impl<'de> Deserialize<'de> for WeatherAdvisory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Nested {
                weather: AdvisoryWeather,
                #[serde(default)]
                advisory: Vec<String>,
                #[serde(default)]
                farming_tips: Vec<String>,
            },
            Flat {
                #[serde(flatten)]
                weather: AdvisoryWeather,
                #[serde(default)]
                farming_advice: Option<String>,
            },
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Nested {
                weather,
                advisory,
                farming_tips,
            } => Self {
                weather,
                advisory,
                farming_tips,
            },
            Wire::Flat {
                weather,
                farming_advice,
            } => Self {
                weather,
                advisory: farming_advice.into_iter().collect(),
                farming_tips: Vec::new(),
            },
        })
    }
}

/// `GET /api/advisory/recommendations` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendations {
    pub crops: Vec<String>,
    #[serde(alias = "recommendations")]
    pub tips: Vec<String>,
}

/// Farming practice used for sustainability estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FarmingMethod {
    #[default]
    Conventional,
    Organic,
    Precision,
}

impl FarmingMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conventional => "conventional",
            Self::Organic => "organic",
            Self::Precision => "precision",
        }
    }
}

impl std::str::FromStr for FarmingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conventional" => Ok(Self::Conventional),
            "organic" => Ok(Self::Organic),
            "precision" => Ok(Self::Precision),
            _ => Err(format!("invalid farming method: {s}")),
        }
    }
}

/// Carbon footprint breakdown, in kg CO2.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarbonFootprint {
    pub total_kg_co2: f64,
    pub per_hectare_kg_co2: f64,
    pub savings_vs_conventional_kg: f64,
    pub savings_percentage: f64,
}

/// `GET /api/advisory/sustainability-metrics` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SustainabilityMetrics {
    pub crop: String,
    pub area_hectares: f64,
    #[serde(default)]
    pub farming_method: FarmingMethod,
    #[serde(default)]
    pub carbon_footprint: CarbonFootprint,
    #[serde(default)]
    pub sustainability_score: u8,
}

/// Overall verdict of an image analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropHealthStatus {
    Healthy,
    NeedsAttention,
    Critical,
}

impl CropHealthStatus {
    /// Classify an overall health score (0–100).
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        if score > 85 {
            Self::Healthy
        } else if score > 70 {
            Self::NeedsAttention
        } else {
            Self::Critical
        }
    }
}

/// A suspected disease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseasePrediction {
    pub disease_name: String,
    pub confidence: f64,
    #[serde(default)]
    pub severity: Option<String>,
}

/// `POST /api/advisory/crop-image-analysis` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropImageAnalysis {
    pub analysis_id: String,
    pub crop_type: String,
    pub overall_health_score: u8,
    #[serde(default)]
    pub disease_predictions: Vec<DiseasePrediction>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub confidence_score: f64,
    pub status: CropHealthStatus,
}

// =============================================================================
// Admin and location
// =============================================================================

/// User counts from `GET /api/admin/stats`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UserMetrics {
    pub total_users: u64,
    pub total_farmers: u64,
    pub total_consumers: u64,
    pub active_users_today: u64,
    pub new_registrations_today: u64,
    pub user_growth_rate: String,
}

/// Sales figures from `GET /api/admin/stats`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BusinessMetrics {
    pub total_orders: u64,
    pub total_revenue: f64,
    pub orders_today: u64,
    pub revenue_today: f64,
    pub avg_order_value: f64,
    pub revenue_growth_rate: String,
}

/// `GET /api/admin/stats` response. Sections not modelled here are kept raw.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AdminStats {
    #[serde(default)]
    pub user_metrics: UserMetrics,
    #[serde(default)]
    pub business_metrics: BusinessMetrics,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// `GET /api/admin/users` response.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPage {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
}

/// A user near a point, from `GET /api/location/nearby-users`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NearbyUser {
    pub id: UserId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub role: Role,
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lng: f64,
    #[serde(default)]
    pub city: Option<String>,
    /// Kilometres from the query point.
    pub distance: f64,
    #[serde(default)]
    pub crops: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NearbyUserList {
    #[serde(default)]
    pub users: Vec<NearbyUser>,
}

/// `GET /api/location/user-stats/{id}` response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LocationStats {
    pub user_id: String,
    pub total_connections: u32,
    pub nearby_farmers: u32,
    pub nearby_consumers: u32,
    pub successful_transactions: u32,
    pub average_distance: f64,
}
