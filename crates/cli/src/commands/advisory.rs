//! Weather, crop advice and photo analysis.

use std::path::Path;

use kisan_setu_client::DegradableExt;
use kisan_setu_client::api::CropImage;
use kisan_setu_client::api::types::CropHealthStatus;
use kisan_setu_core::{Language, Season};

use super::{CommandError, Context, offline_marker};

const fn status_label(status: CropHealthStatus, language: Language) -> &'static str {
    match (status, language) {
        (CropHealthStatus::Healthy, Language::En) => "healthy",
        (CropHealthStatus::Healthy, Language::Hi) => "स्वस्थ",
        (CropHealthStatus::NeedsAttention, Language::En) => "needs attention",
        (CropHealthStatus::NeedsAttention, Language::Hi) => "ध्यान दें",
        (CropHealthStatus::Critical, Language::En) => "critical",
        (CropHealthStatus::Critical, Language::Hi) => "गंभीर",
    }
}

/// The city to use when none is given: the saved location's.
async fn default_city(ctx: &Context) -> String {
    ctx.state.location().current_location().await.city
}

/// Current conditions and the farming advisory for `city`.
///
/// Live conditions need a weather API key; the advisory always shows,
/// offline if need be.
///
/// # Errors
///
/// Only when the request is cancelled.
pub async fn weather(ctx: &Context, city: Option<&str>) -> Result<(), CommandError> {
    let city = match city {
        Some(city) => city.to_string(),
        None => default_city(ctx).await,
    };

    if let Some(current) = ctx.state.weather().current(Some(&city)).await {
        let description = current
            .condition()
            .map_or("", |condition| condition.description.as_str());
        println!(
            "{}: {:.1}°C (feels like {:.1}°C), humidity {:.0}%, wind {:.1} m/s {description}",
            current.name,
            current.main.temp,
            current.main.feels_like,
            current.main.humidity,
            current.wind.speed,
        );
    }

    let advisory = ctx
        .state
        .gateway()
        .get_weather_advisory(Some(&city), ctx.language())
        .await?;
    let offline = advisory.is_fallback();
    let advisory = advisory.into_value();

    println!("Advisory for {}{}", advisory.weather.city, offline_marker(offline));
    for line in &advisory.advisory {
        println!("  - {line}");
    }
    if !advisory.farming_tips.is_empty() {
        println!("Tips:");
        for tip in &advisory.farming_tips {
            println!("  - {tip}");
        }
    }
    Ok(())
}

/// Crops and practices for `season` (winter when `None`).
///
/// # Errors
///
/// Only when the request is cancelled.
pub async fn advice(ctx: &Context, season: Option<Season>) -> Result<(), CommandError> {
    let season = season.unwrap_or_default();
    let city = default_city(ctx).await;

    let result = ctx
        .state
        .gateway()
        .get_recommendations(season, &city, ctx.language())
        .await?;
    let offline = result.is_fallback();
    let recommendations = result.into_value();

    println!(
        "{} crops for {city}{}: {}",
        season.as_str(),
        offline_marker(offline),
        recommendations.crops.join(", ")
    );
    for tip in &recommendations.tips {
        println!("  - {tip}");
    }
    Ok(())
}

/// Analyse the photo at `path` and keep it in the scan history.
///
/// # Errors
///
/// Returns [`CommandError::Io`] if the photo cannot be read.
pub async fn scan(ctx: &Context, path: &Path, crop: Option<&str>) -> Result<(), CommandError> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map_or_else(|| "image.jpg".to_string(), |name| name.to_string_lossy().into_owned());

    let result = ctx
        .state
        .analyze_crop_image(CropImage { file_name, bytes }, crop)
        .await?;
    let offline = result.is_fallback();
    let analysis = result.into_value();

    println!(
        "{}: {}/100, {}{}",
        analysis.crop_type,
        analysis.overall_health_score,
        status_label(analysis.status, ctx.language()),
        offline_marker(offline),
    );
    for disease in &analysis.disease_predictions {
        println!(
            "  {} ({:.0}%{})",
            disease.disease_name,
            disease.confidence * 100.0,
            disease
                .severity
                .as_deref()
                .map(|s| format!(", {s}"))
                .unwrap_or_default(),
        );
    }
    for recommendation in &analysis.recommendations {
        println!("  - {recommendation}");
    }
    Ok(())
}

/// Recent crop scans, newest first.
pub fn scans(ctx: &Context) {
    let scans = ctx.state.scans().list();
    if scans.is_empty() {
        println!("No crop scans yet.");
        return;
    }

    for scan in &scans {
        println!(
            "{}  {:<16} {:>3}/100  {}{}",
            scan.scanned_at.format("%Y-%m-%d %H:%M"),
            scan.image_name,
            scan.analysis.overall_health_score,
            status_label(scan.analysis.status, ctx.language()),
            offline_marker(scan.offline),
        );
    }
}
