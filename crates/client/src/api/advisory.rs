//! `/api/advisory` routes. Every one of them has an offline substitute.

use kisan_setu_core::{Language, Season};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use tracing::instrument;

use super::types::{
    CropHealthPrediction, CropHealthQuery, CropImageAnalysis, FarmingMethod, Recommendations,
    SustainabilityMetrics, WeatherAdvisory,
};
use super::{Degradable, Gateway, degrade, mock};
use crate::error::ApiResult;

/// A photo submitted for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Gateway {
    /// Predict crop health from field conditions.
    ///
    /// # Errors
    ///
    /// Only [`crate::ApiError::Cancelled`].
    #[instrument(skip(self))]
    pub async fn predict_crop_health(
        &self,
        query: &CropHealthQuery,
    ) -> ApiResult<Degradable<CropHealthPrediction>> {
        let request = self
            .request(Method::POST, "/api/advisory/predict")
            .query(query)
            .query(&[("crop_name", query.crop.as_str())]);
        let result = self.execute(request).await;

        degrade("predict_crop_health", result, || mock::crop_health(query))
    }

    /// Weather-based farming advice for `city` (Delhi when `None`).
    ///
    /// # Errors
    ///
    /// Only [`crate::ApiError::Cancelled`].
    #[instrument(skip(self))]
    pub async fn get_weather_advisory(
        &self,
        city: Option<&str>,
        language: Language,
    ) -> ApiResult<Degradable<WeatherAdvisory>> {
        let request = self
            .request(Method::GET, "/api/advisory/weather")
            .query(&[
                ("city", city.unwrap_or(mock::DEFAULT_CITY)),
                ("language", language.code()),
            ]);
        let result = self.execute(request).await;

        degrade("get_weather_advisory", result, || mock::weather_advisory(city))
    }

    /// Crops and practices suited to `season`.
    ///
    /// # Errors
    ///
    /// Only [`crate::ApiError::Cancelled`].
    #[instrument(skip(self))]
    pub async fn get_recommendations(
        &self,
        season: Season,
        location: &str,
        language: Language,
    ) -> ApiResult<Degradable<Recommendations>> {
        let request = self
            .request(Method::GET, "/api/advisory/recommendations")
            .query(&[
                ("season", season.as_str()),
                ("location", location),
                ("language", language.code()),
            ]);
        let result = self.execute(request).await;

        degrade("get_recommendations", result, || {
            mock::recommendations(season, language)
        })
    }

    /// Carbon footprint of farming `area_hectares` of `crop` with `method`.
    ///
    /// # Errors
    ///
    /// Only [`crate::ApiError::Cancelled`].
    #[instrument(skip(self))]
    pub async fn sustainability_metrics(
        &self,
        crop: &str,
        area_hectares: f64,
        method: FarmingMethod,
    ) -> ApiResult<Degradable<SustainabilityMetrics>> {
        let request = self
            .request(Method::GET, "/api/advisory/sustainability-metrics")
            .query(&[
                ("crop", crop.to_string()),
                ("area_hectares", area_hectares.to_string()),
                ("farming_method", method.as_str().to_string()),
            ]);
        let result = self.execute(request).await;

        degrade("sustainability_metrics", result, || {
            mock::sustainability(crop, area_hectares, method)
        })
    }

    /// Analyse a crop photo for disease.
    ///
    /// Offline, a plausible but random analysis is returned.
    ///
    /// # Errors
    ///
    /// Only [`crate::ApiError::Cancelled`].
    #[instrument(skip(self, image), fields(file_name = %image.file_name, size = image.bytes.len()))]
    pub async fn analyze_crop_image(
        &self,
        image: CropImage,
        crop_type: Option<&str>,
    ) -> ApiResult<Degradable<CropImageAnalysis>> {
        let mut form = Form::new().part("file", Part::bytes(image.bytes).file_name(image.file_name));
        if let Some(crop_type) = crop_type {
            form = form.text("crop_type", crop_type.to_string());
        }

        let request = self
            .request(Method::POST, "/api/advisory/crop-image-analysis")
            .multipart(form);
        let result = self.execute(request).await;

        degrade("analyze_crop_image", result, || {
            mock::crop_image_analysis(crop_type, &mut rand::rng())
        })
    }
}
