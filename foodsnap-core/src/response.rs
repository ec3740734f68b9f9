//! External response schema and the normalizer that builds it

use crate::types::{NutritionRecord, PredictionResult, UNKNOWN_FOOD};
use serde::{Deserialize, Serialize};

/// Stable response returned to the request layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub status: String,
    pub items: Vec<NutritionRecord>,
    pub total_calories: u64,
    pub image_url: Option<String>,
    pub prediction_id: Option<String>,
}

impl PredictionResponse {
    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    pub fn with_prediction_id(mut self, prediction_id: Option<String>) -> Self {
        self.prediction_id = prediction_id;
        self
    }
}

/// Maps a prediction and its resolved records into [`PredictionResponse`]
pub struct ResponseNormalizer;

impl ResponseNormalizer {
    pub const SUCCESS: &'static str = "success";

    /// Build the response. `records` holds one entry per accepted item, in
    /// item order. An unknown prediction yields a single zeroed
    /// "Unknown food" record.
    pub fn normalize(prediction: &PredictionResult, records: Vec<NutritionRecord>) -> PredictionResponse {
        let items = if prediction.is_unknown() && records.is_empty() {
            vec![NutritionRecord::not_found(UNKNOWN_FOOD)]
        } else {
            records
        };

        PredictionResponse {
            status: Self::SUCCESS.to_string(),
            total_calories: Self::total_calories(&items),
            items,
            image_url: None,
            prediction_id: None,
        }
    }

    /// Sum of record calories
    pub fn total_calories(records: &[NutritionRecord]) -> u64 {
        records.iter().map(|r| u64::from(r.calories)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FoodSize, NutritionSource};

    fn record(food: &str, calories: f64) -> NutritionRecord {
        NutritionRecord::new(food, "1 serving", calories, 1.0, 2.0, 3.0, NutritionSource::Edamam)
    }

    #[test]
    fn test_total_calories_zero_items() {
        assert_eq!(ResponseNormalizer::total_calories(&[]), 0);
    }

    #[test]
    fn test_total_calories_one_item() {
        let prediction = PredictionResult::accepted(vec!["rice".into()], 0.9, FoodSize::Medium);
        let response = ResponseNormalizer::normalize(&prediction, vec![record("rice", 206.0)]);
        assert_eq!(response.total_calories, 206);
        assert_eq!(response.status, "success");
        assert_eq!(response.items.len(), 1);
    }

    #[test]
    fn test_total_calories_many_items() {
        let prediction = PredictionResult::accepted(
            vec!["rice".into(), "dal".into(), "naan".into()],
            0.9,
            FoodSize::Large,
        );
        let records = vec![record("rice", 206.0), record("dal", 116.0), record("naan", 262.0)];
        let response = ResponseNormalizer::normalize(&prediction, records);
        assert_eq!(response.total_calories, 584);
        assert_eq!(response.items[2].food, "naan");
    }

    #[test]
    fn test_unknown_prediction_gets_placeholder_record() {
        let prediction = PredictionResult::unknown(0.45);
        let response = ResponseNormalizer::normalize(&prediction, vec![]);
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].food, UNKNOWN_FOOD);
        assert!(response.items[0].is_not_found());
        assert_eq!(response.total_calories, 0);
    }

    #[test]
    fn test_response_json_shape() {
        let prediction = PredictionResult::accepted(vec!["dal".into()], 0.82, FoodSize::Medium);
        let response = ResponseNormalizer::normalize(&prediction, vec![record("dal", 116.0)])
            .with_prediction_id(Some("abc".to_string()));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["total_calories"], 116);
        assert_eq!(json["prediction_id"], "abc");
        assert!(json["image_url"].is_null());
        assert_eq!(json["items"][0]["source"], "Edamam");
        assert_eq!(json["items"][0]["calories"], 116);
    }
}
