//! Offline data served when the backend cannot be reached.
//!
//! Every value here is deterministic except [`crop_image_analysis`], which
//! takes its randomness from the caller.

use chrono::{DateTime, Utc};
use kisan_setu_core::{Category, Language, Product, ProductId, Role, Rupees, Season, User, UserId};
use rand::Rng;

use super::types::{
    AdvisoryWeather, CarbonFootprint, CropHealthPrediction, CropHealthQuery, CropHealthStatus,
    CropImageAnalysis, DiseasePrediction, FarmingMethod, Recommendations, RegisterRequest,
    SustainabilityMetrics, WeatherAdvisory,
};

/// Usernames that can sign in without a backend.
pub const DEMO_ACCOUNTS: [&str; 3] = ["admin", "farmer1", "consumer1"];

/// City used when a caller does not name one.
pub const DEFAULT_CITY: &str = "Delhi";

fn mock_token(now: DateTime<Utc>) -> String {
    format!("mock_token_{}", now.timestamp_millis())
}

/// The offline account for `username`, if it is one of [`DEMO_ACCOUNTS`].
#[must_use]
pub fn demo_user(username: &str, now: DateTime<Utc>) -> Option<User> {
    let (id, full_name, role) = match username {
        "admin" => (1, "Admin User", Role::Admin),
        "farmer1" => (2, "Demo Farmer", Role::Farmer),
        "consumer1" => (3, "Demo Consumer", Role::Consumer),
        _ => return None,
    };

    let mut user = User::new(UserId::from(id), username);
    user.full_name = full_name.to_string();
    user.email = Some(format!("{username}@demo.com"));
    user.role = role;
    user.access_token = Some(mock_token(now));
    user.token_type = Some("bearer".to_string());
    Some(user)
}

/// A locally minted account for a registration the backend never saw.
#[must_use]
pub fn registered_user(request: &RegisterRequest, now: DateTime<Utc>) -> User {
    let mut user = User::new(UserId::from(now.timestamp_millis()), request.username.clone());
    user.full_name.clone_from(&request.full_name);
    user.email = Some(request.email.clone());
    user.phone.clone_from(&request.phone);
    user.role = request.user_type;
    user.access_token = Some(mock_token(now));
    user.token_type = Some("bearer".to_string());
    user
}

#[allow(clippy::too_many_arguments)]
fn product(
    id: i64,
    name: &str,
    price: i64,
    category: &str,
    seller: &str,
    location: &str,
    distance_km: f64,
    sustainability_score: u8,
    carbon_footprint: f64,
    organic: bool,
    rating: f64,
    quantity_kg: u32,
    image: &str,
) -> Product {
    Product {
        id: ProductId::from(id),
        name: name.to_string(),
        price: Rupees::new(price),
        category: category.to_string(),
        seller: Some(seller.to_string()),
        location: Some(location.to_string()),
        distance_km: Some(distance_km),
        sustainability_score: Some(sustainability_score),
        carbon_footprint: Some(carbon_footprint),
        organic,
        rating: Some(rating),
        quantity_kg: Some(quantity_kg),
        image: Some(image.to_string()),
    }
}

/// The offline product shelf.
#[must_use]
pub fn products() -> Vec<Product> {
    vec![
        product(1, "Organic Wheat", 25, "grains", "Ram Singh", "Punjab", 15.0, 95, 1.2, true, 4.8, 500, "/seeds.jpg"),
        product(2, "Fresh Tomatoes", 30, "vegetables", "Shyam Kumar", "Haryana", 8.0, 85, 0.8, false, 4.5, 200, "/placeholder.jpg"),
        product(3, "Basmati Rice", 80, "grains", "Gita Devi", "UP", 25.0, 90, 2.1, true, 4.9, 1000, "/seeds.jpg"),
        product(4, "Red Onions", 25, "vegetables", "Mohan Lal", "Rajasthan", 45.0, 80, 1.5, false, 4.3, 300, "/placeholder.jpg"),
        product(5, "Organic Fertilizer", 500, "supplies", "EcoFarm Solutions", "Local", 5.0, 100, 0.3, true, 4.7, 50, "/fertilizer.jpg"),
        product(6, "Heirloom Seeds", 150, "supplies", "Heritage Seeds Co", "Karnataka", 12.0, 98, 0.1, true, 4.9, 2, "/seeds.jpg"),
    ]
}

/// The offline product with `id`, if any.
#[must_use]
pub fn product_by_id(id: &ProductId) -> Option<Product> {
    products().into_iter().find(|p| &p.id == id)
}

/// The offline category list.
#[must_use]
pub fn categories() -> Vec<Category> {
    [
        ("grains", "Grains", "🌾"),
        ("vegetables", "Vegetables", "🥕"),
        ("fruits", "Fruits", "🍎"),
        ("supplies", "Supplies", "🛠️"),
    ]
    .into_iter()
    .map(|(id, name, icon)| Category {
        id: id.to_string(),
        name: name.to_string(),
        icon: Some(icon.to_string()),
    })
    .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// A healthy prediction echoing the query.
#[must_use]
pub fn crop_health(query: &CropHealthQuery) -> CropHealthPrediction {
    let or = |value: &str, default: &str| {
        if value.trim().is_empty() {
            default.to_string()
        } else {
            value.to_string()
        }
    };
    CropHealthPrediction {
        crop: or(&query.crop, "wheat"),
        season: Some(query.season.as_str().to_string()),
        soil_type: Some(or(&query.soil_type, "loamy")),
        health_score: Some(85),
        status: "healthy".to_string(),
        recommendations: strings(&[
            "Apply organic fertilizer every 2 weeks",
            "Monitor soil moisture levels daily",
            "Check for pest infestation regularly",
        ]),
        confidence: 88.0,
    }
}

/// Mild-conditions advisory for `city` (default Delhi).
#[must_use]
pub fn weather_advisory(city: Option<&str>) -> WeatherAdvisory {
    WeatherAdvisory {
        weather: AdvisoryWeather {
            city: city
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(DEFAULT_CITY)
                .to_string(),
            temperature: 25.0,
            humidity: 65.0,
            rainfall: 0.0,
            wind_speed: 10.0,
        },
        advisory: strings(&[
            "Good weather conditions for farming",
            "Maintain regular irrigation schedule",
            "Monitor crop health daily",
        ]),
        farming_tips: strings(&[
            "Best time for field operations: Early morning",
            "Apply fertilizers during cool hours",
            "Ensure proper drainage in fields",
        ]),
    }
}

/// Seasonal crops and tips.
#[must_use]
pub fn recommendations(season: Season, language: Language) -> Recommendations {
    let (crops, tips): (&[&str], &[&str]) = match (season, language) {
        (Season::Winter, Language::En) => (
            &["Wheat", "Mustard", "Peas", "Potato", "Barley", "Gram"],
            &[
                "Prepare soil for rabi crops with proper plowing",
                "Apply organic manure 2-3 weeks before sowing",
                "Ensure proper irrigation scheduling",
                "Monitor temperature for frost protection",
                "Use certified seeds for better yield",
                "Apply balanced NPK fertilizers",
            ],
        ),
        (Season::Winter, Language::Hi) => (
            &["गेहूं", "सरसों", "मटर", "आलू", "जौ", "चना"],
            &[
                "रबी फसलों के लिए उचित जुताई के साथ मिट्टी तैयार करें",
                "बुवाई से 2-3 सप्ताह पहले जैविक खाद डालें",
                "उचित सिंचाई का समय निर्धारण करें",
                "पाले से बचाव के लिए तापमान की निगरानी करें",
                "बेहतर उत्पादन के लिए प्रमाणित बीजों का उपयोग करें",
                "संतुलित NPK उर्वरक का प्रयोग करें",
            ],
        ),
        (Season::Summer, Language::En) => (
            &["Rice", "Cotton", "Sugarcane", "Maize", "Fodder crops", "Vegetables"],
            &[
                "Focus on water conservation techniques",
                "Use mulching to retain soil moisture",
                "Plant heat-resistant crop varieties",
                "Install drip irrigation systems",
                "Provide shade nets for sensitive crops",
                "Monitor soil moisture levels daily",
            ],
        ),
        (Season::Summer, Language::Hi) => (
            &["धान", "कपास", "गन्ना", "मक्का", "चारा फसलें", "सब्जियां"],
            &[
                "जल संरक्षण तकनीकों पर ध्यान दें",
                "मिट्टी की नमी बनाए रखने के लिए मल्चिंग का उपयोग करें",
                "गर्मी प्रतिरोधी किस्मों की बुवाई करें",
                "ड्रिप सिंचाई प्रणाली स्थापित करें",
                "संवेदनशील फसलों के लिए छाया जाल प्रदान करें",
                "मिट्टी की नमी का दैनिक निरीक्षण करें",
            ],
        ),
        (Season::Monsoon, Language::En) => (
            &["Rice", "Cotton", "Pulses", "Vegetables", "Sugarcane", "Fodder"],
            &[
                "Ensure proper field drainage systems",
                "Monitor for pest and disease outbreaks",
                "Harvest mature crops before heavy rains",
                "Apply preventive fungicide sprays",
                "Maintain proper plant spacing",
                "Store harvested crops in dry places",
            ],
        ),
        (Season::Monsoon, Language::Hi) => (
            &["धान", "कपास", "दालें", "सब्जियां", "गन्ना", "चारा"],
            &[
                "खेत में उचित जल निकासी व्यवस्था सुनिश्चित करें",
                "कीट और रोग के प्रकोप की निगरानी करें",
                "भारी बारिश से पहले पकी फसल की कटाई करें",
                "रोकथाम के लिए फफूंदनाशी का छिड़काव करें",
                "पौधों के बीच उचित दूरी बनाए रखें",
                "कटी हुई फसल को सूखी जगह पर भंडारित करें",
            ],
        ),
    };
    Recommendations {
        crops: strings(crops),
        tips: strings(tips),
    }
}

/// Conventional farming emits this much CO2 per hectare (kg).
const CONVENTIONAL_KG_PER_HECTARE: f64 = 2800.0;

/// Estimate the footprint of farming `area_hectares` of `crop`.
///
/// A non-positive or non-finite area is treated as one hectare.
#[must_use]
pub fn sustainability(crop: &str, area_hectares: f64, method: FarmingMethod) -> SustainabilityMetrics {
    let area = if area_hectares.is_finite() && area_hectares > 0.0 {
        area_hectares
    } else {
        1.0
    };
    let (per_hectare, savings_percentage, score) = match method {
        FarmingMethod::Organic => (2200.0, 21.4, 85),
        FarmingMethod::Precision => (2000.0, 28.6, 90),
        FarmingMethod::Conventional => (CONVENTIONAL_KG_PER_HECTARE, 0.0, 60),
    };

    SustainabilityMetrics {
        crop: if crop.trim().is_empty() {
            "wheat".to_string()
        } else {
            crop.to_string()
        },
        area_hectares: area,
        farming_method: method,
        carbon_footprint: CarbonFootprint {
            total_kg_co2: per_hectare * area,
            per_hectare_kg_co2: per_hectare,
            savings_vs_conventional_kg: (CONVENTIONAL_KG_PER_HECTARE - per_hectare) * area,
            savings_percentage,
        },
        sustainability_score: score,
    }
}

/// A plausible analysis of a crop photo.
///
/// Scores below 85 report early blight, with high severity below 75.
pub fn crop_image_analysis(crop_type: Option<&str>, rng: &mut impl Rng) -> CropImageAnalysis {
    let health: u8 = rng.random_range(70..=99);
    let diseases = if health < 85 {
        vec![DiseasePrediction {
            disease_name: "Early Blight".to_string(),
            confidence: f64::from(rng.random_range(80_u8..=99)),
            severity: Some(if health < 75 { "high" } else { "moderate" }.to_string()),
        }]
    } else {
        Vec::new()
    };

    let mut recommendations = strings(&[
        "Monitor crop health daily",
        "Apply organic fertilizer regularly",
        "Ensure proper irrigation",
    ]);
    recommendations.push(
        if diseases.is_empty() {
            "Continue current care routine"
        } else {
            "Apply appropriate fungicide treatment"
        }
        .to_string(),
    );

    CropImageAnalysis {
        analysis_id: format!("IMG_{}", rng.random_range(10_000..=99_999)),
        crop_type: crop_type
            .filter(|c| !c.trim().is_empty())
            .unwrap_or("tomato")
            .to_string(),
        overall_health_score: health,
        disease_predictions: diseases,
        recommendations,
        confidence_score: f64::from(rng.random_range(85_u8..=94)),
        status: CropHealthStatus::from_score(health),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_demo_accounts() {
        let now = Utc::now();
        let admin = demo_user("admin", now).unwrap();
        assert_eq!(admin.id, UserId::from(1));
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.email.as_deref(), Some("admin@demo.com"));
        assert!(admin.access_token.unwrap().starts_with("mock_token_"));

        assert_eq!(demo_user("farmer1", now).unwrap().full_name, "Demo Farmer");
        assert_eq!(demo_user("consumer1", now).unwrap().role, Role::Consumer);
        assert!(demo_user("farmer2", now).is_none());
    }

    #[test]
    fn test_shelf_has_six_products_and_four_categories() {
        assert_eq!(products().len(), 6);
        assert_eq!(categories().len(), 4);
        assert_eq!(
            product_by_id(&ProductId::from(3)).unwrap().name,
            "Basmati Rice"
        );
        assert!(product_by_id(&ProductId::from(42)).is_none());
    }

    #[test]
    fn test_recommendations_cover_every_season() {
        for season in [Season::Winter, Season::Summer, Season::Monsoon] {
            for language in [Language::En, Language::Hi] {
                let recs = recommendations(season, language);
                assert_eq!(recs.crops.len(), 6);
                assert_eq!(recs.tips.len(), 6);
            }
        }
        assert_eq!(recommendations(Season::Winter, Language::En).crops[0], "Wheat");
        assert_eq!(recommendations(Season::Winter, Language::Hi).crops[0], "गेहूं");
    }

    #[test]
    fn test_sustainability_by_method() {
        let organic = sustainability("wheat", 2.0, FarmingMethod::Organic);
        assert!((organic.carbon_footprint.total_kg_co2 - 4400.0).abs() < f64::EPSILON);
        assert!((organic.carbon_footprint.savings_vs_conventional_kg - 1200.0).abs() < f64::EPSILON);
        assert_eq!(organic.sustainability_score, 85);

        let conventional = sustainability("", 0.0, FarmingMethod::Conventional);
        assert_eq!(conventional.crop, "wheat");
        assert!((conventional.area_hectares - 1.0).abs() < f64::EPSILON);
        assert!(conventional.carbon_footprint.savings_vs_conventional_kg.abs() < f64::EPSILON);
        assert_eq!(conventional.sustainability_score, 60);
    }

    #[test]
    fn test_image_analysis_is_internally_consistent() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let analysis = crop_image_analysis(None, &mut rng);
            assert_eq!(analysis.crop_type, "tomato");
            assert!((70..=99).contains(&analysis.overall_health_score));
            assert_eq!(
                analysis.disease_predictions.is_empty(),
                analysis.overall_health_score >= 85
            );
            assert_eq!(
                analysis.status,
                CropHealthStatus::from_score(analysis.overall_health_score)
            );
            assert_eq!(analysis.recommendations.len(), 4);
            assert!(analysis.analysis_id.starts_with("IMG_"));
        }
    }

    #[test]
    fn test_weather_advisory_defaults_to_delhi() {
        assert_eq!(weather_advisory(None).weather.city, "Delhi");
        assert_eq!(weather_advisory(Some("Pune")).weather.city, "Pune");
    }
}
