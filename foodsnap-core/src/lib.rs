//! foodsnap-core: shared data model for FoodSnap
//!
//! Holds the types that flow between the vision pipeline and the nutrition
//! resolver, plus the normalizer that turns them into the external response.

pub mod types;
pub mod response;

pub use types::{
    ClassScore, FoodSize, NutritionQuery, NutritionRecord, NutritionSource, PredictionResult, RegionOutcome,
    NOT_FOUND_SOURCE, UNKNOWN_FOOD, UNKNOWN_SERVING,
};
pub use response::{PredictionResponse, ResponseNormalizer};
