//! Application context shared by every request

use crate::config::AppConfig;
use crate::error::{ApiError, Result};
use foodsnap_core::{NutritionRecord, PredictionResponse, PredictionResult, ResponseNormalizer};
use foodsnap_eye::{ImagePreprocessor, InferencePipeline};
use foodsnap_nutrition::NutritionResolver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Liveness report of the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub model_loaded: bool,
    pub mock_mode: bool,
    pub detector_loaded: bool,
    pub nutrition_providers: Vec<String>,
}

/// Prediction together with the response built from it
#[derive(Debug, Clone)]
pub struct Analysis {
    pub prediction: PredictionResult,
    pub response: PredictionResponse,
}

/// Built once at startup and passed by reference to request handlers
pub struct FoodSnap {
    pipeline: Arc<InferencePipeline>,
    resolver: NutritionResolver,
}

impl FoodSnap {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let pipeline = InferencePipeline::from_config(config.vision)
            .map_err(|e| ApiError::Config(e.to_string()))?;
        let resolver = NutritionResolver::from_config(&config.nutrition)
            .map_err(|e| ApiError::Config(e.to_string()))?;

        Ok(Self::from_parts(pipeline, resolver))
    }

    pub fn from_parts(pipeline: InferencePipeline, resolver: NutritionResolver) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            resolver,
        }
    }

    pub fn pipeline(&self) -> &InferencePipeline {
        &self.pipeline
    }

    pub fn resolver(&self) -> &NutritionResolver {
        &self.resolver
    }

    /// Identify the food in an upload and resolve its nutrition
    pub async fn analyze(&self, bytes: Vec<u8>, mime: &str) -> Result<PredictionResponse> {
        Ok(self.analyze_detailed(bytes, mime).await?.response)
    }

    /// Like [`FoodSnap::analyze`] but also returns the raw prediction
    pub async fn analyze_detailed(&self, bytes: Vec<u8>, mime: &str) -> Result<Analysis> {
        ImagePreprocessor::format_for_mime(mime)?;

        let prediction_id = Uuid::new_v4().to_string();
        let span = info_span!("analyze", prediction_id = %prediction_id);

        async move {
            let pipeline = Arc::clone(&self.pipeline);
            let mime = mime.to_string();
            let prediction = tokio::task::spawn_blocking(move || pipeline.predict(&bytes, &mime))
                .await
                .map_err(|e| {
                    error!("Inference task failed: {}", e);
                    ApiError::Internal(format!("Inference task failed: {}", e))
                })??;

            info!(
                "Predicted {:?} (confidence {:.2}, unknown: {}, mock: {})",
                prediction.items(),
                prediction.confidence(),
                prediction.is_unknown(),
                prediction.is_mock()
            );

            let records = self.resolver.resolve_all(prediction.accepted_items()).await;
            let response = ResponseNormalizer::normalize(&prediction, records)
                .with_prediction_id(Some(prediction_id));

            info!(
                "Analysis complete: {} item(s), {} kcal",
                response.items.len(),
                response.total_calories
            );
            Ok::<Analysis, ApiError>(Analysis {
                prediction,
                response,
            })
        }
        .instrument(span)
        .await
    }

    /// Nutrition lookup for a food name
    pub async fn nutrition(&self, food_name: &str) -> NutritionRecord {
        self.resolver.resolve(food_name).await
    }

    pub fn health(&self) -> HealthReport {
        let mock_mode = self.pipeline.is_mock();
        HealthReport {
            status: "running".to_string(),
            model_loaded: !mock_mode,
            mock_mode,
            detector_loaded: self.pipeline.has_detector(),
            nutrition_providers: self
                .resolver
                .configured_providers()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}
