use serde::{Deserialize, Serialize};
use std::fmt;

/// Label reported when the classifier is not confident enough
pub const UNKNOWN_FOOD: &str = "Unknown food";

/// Source tag of a record no provider could resolve
pub const NOT_FOUND_SOURCE: &str = "Not Found";

/// Serving size reported on a not-found record
pub const UNKNOWN_SERVING: &str = "Unknown";

/// Portion-size bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodSize {
    Small,
    Medium,
    Large,
    Unknown,
}

impl FoodSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoodSize::Small => "small",
            FoodSize::Medium => "medium",
            FoodSize::Large => "large",
            FoodSize::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FoodSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate class and its probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScore {
    pub class: String,
    pub score: f32,
}

impl ClassScore {
    pub fn new(class: impl Into<String>, score: f32) -> Self {
        Self {
            class: class.into(),
            score,
        }
    }
}

/// Per-region detail kept on a prediction for observability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionOutcome {
    /// Label the classifier produced for the region
    pub label: String,
    /// Classifier score
    pub score: f32,
    /// Detector score, `None` for the implicit full-image region
    pub detection_score: Option<f32>,
    /// Whether the confidence gate accepted the region
    pub accepted: bool,
    /// Best classifier candidates, highest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_k: Vec<ClassScore>,
}

/// Result of one inference call.
///
/// Fields are private so the unknown invariant cannot be broken after
/// construction: an unknown result always carries `["Unknown food"]` together
/// with the measured (rejected) confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PredictionResultFields")]
pub struct PredictionResult {
    class: String,
    items: Vec<String>,
    confidence: f32,
    is_unknown: bool,
    size: FoodSize,
    is_mock: bool,
    regions: Vec<RegionOutcome>,
}

/// Deserialized shape of a [`PredictionResult`], checked before use
#[derive(Deserialize)]
struct PredictionResultFields {
    class: String,
    items: Vec<String>,
    confidence: f32,
    is_unknown: bool,
    size: FoodSize,
    #[serde(default)]
    is_mock: bool,
    #[serde(default)]
    regions: Vec<RegionOutcome>,
}

impl TryFrom<PredictionResultFields> for PredictionResult {
    type Error = String;

    fn try_from(fields: PredictionResultFields) -> Result<Self, Self::Error> {
        if !fields.confidence.is_finite() || !(0.0..=1.0).contains(&fields.confidence) {
            return Err(format!("confidence {} outside [0, 1]", fields.confidence));
        }

        let result = if fields.is_unknown {
            if fields.items != [UNKNOWN_FOOD] || fields.class != UNKNOWN_FOOD {
                return Err(format!("unknown prediction must only carry {:?}", UNKNOWN_FOOD));
            }
            if fields.size != FoodSize::Unknown {
                return Err("unknown prediction cannot have a size".to_string());
            }
            PredictionResult::unknown(fields.confidence)
        } else {
            if fields.items.is_empty() || fields.items.iter().any(|item| item == UNKNOWN_FOOD) {
                return Err("accepted prediction needs real items".to_string());
            }
            if fields.class != fields.items[0] {
                return Err("class must be the first item".to_string());
            }
            PredictionResult::accepted(fields.items, fields.confidence, fields.size)
        };

        Ok(result.with_mock(fields.is_mock).with_regions(fields.regions))
    }
}

impl PredictionResult {
    /// Accepted prediction. Falls back to [`PredictionResult::unknown`] when
    /// `items` is empty.
    pub fn accepted(items: Vec<String>, confidence: f32, size: FoodSize) -> Self {
        if items.is_empty() {
            return Self::unknown(confidence);
        }

        Self {
            class: items[0].clone(),
            items,
            confidence: clamp_unit(confidence),
            is_unknown: false,
            size,
            is_mock: false,
            regions: Vec::new(),
        }
    }

    /// Rejected prediction carrying the measured top score
    pub fn unknown(confidence: f32) -> Self {
        Self {
            class: UNKNOWN_FOOD.to_string(),
            items: vec![UNKNOWN_FOOD.to_string()],
            confidence: clamp_unit(confidence),
            is_unknown: true,
            size: FoodSize::Unknown,
            is_mock: false,
            regions: Vec::new(),
        }
    }

    /// Flag the result as produced by the mock generator
    pub fn with_mock(mut self, is_mock: bool) -> Self {
        self.is_mock = is_mock;
        self
    }

    /// Attach per-region details
    pub fn with_regions(mut self, regions: Vec<RegionOutcome>) -> Self {
        self.regions = regions;
        self
    }

    /// Primary label (first item)
    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn is_unknown(&self) -> bool {
        self.is_unknown
    }

    pub fn size(&self) -> FoodSize {
        self.size
    }

    pub fn is_mock(&self) -> bool {
        self.is_mock
    }

    pub fn regions(&self) -> &[RegionOutcome] {
        &self.regions
    }

    /// Labels that should be resolved to nutrition records
    pub fn accepted_items(&self) -> &[String] {
        if self.is_unknown {
            &[]
        } else {
            &self.items
        }
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Input key of a nutrition lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutritionQuery {
    pub food_name: String,
}

impl NutritionQuery {
    pub fn new(food_name: impl Into<String>) -> Self {
        Self {
            food_name: food_name.into(),
        }
    }

    /// Cache key: lowercase, trimmed, inner whitespace collapsed
    pub fn normalized_key(&self) -> String {
        self.food_name
            .split_whitespace()
            .map(|part| part.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_blank(&self) -> bool {
        self.food_name.trim().is_empty()
    }
}

/// Where a nutrition record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NutritionSource {
    Edamam,
    #[serde(rename = "USDA")]
    Usda,
    Spoonacular,
    OpenFoodFacts,
    #[serde(rename = "Not Found")]
    NotFound,
}

impl NutritionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            NutritionSource::Edamam => "Edamam",
            NutritionSource::Usda => "USDA",
            NutritionSource::Spoonacular => "Spoonacular",
            NutritionSource::OpenFoodFacts => "OpenFoodFacts",
            NutritionSource::NotFound => NOT_FOUND_SOURCE,
        }
    }
}

impl fmt::Display for NutritionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical nutrition record.
///
/// Numeric fields are always present; [`NutritionRecord::new`] truncates
/// calories to an integer, rounds macronutrients to one decimal and maps
/// negative or non-finite input to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    pub food: String,
    pub serving_size: String,
    pub calories: u32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub source: NutritionSource,
}

impl NutritionRecord {
    pub fn new(
        food: impl Into<String>,
        serving_size: impl Into<String>,
        calories: f64,
        protein_g: f64,
        carbs_g: f64,
        fat_g: f64,
        source: NutritionSource,
    ) -> Self {
        Self {
            food: food.into(),
            serving_size: serving_size.into(),
            calories: non_negative(calories).trunc().min(u32::MAX as f64) as u32,
            protein_g: round_tenth(non_negative(protein_g)),
            carbs_g: round_tenth(non_negative(carbs_g)),
            fat_g: round_tenth(non_negative(fat_g)),
            source,
        }
    }

    /// Zeroed record returned when every provider came up empty
    pub fn not_found(food: impl Into<String>) -> Self {
        Self {
            food: food.into(),
            serving_size: UNKNOWN_SERVING.to_string(),
            calories: 0,
            protein_g: 0.0,
            carbs_g: 0.0,
            fat_g: 0.0,
            source: NutritionSource::NotFound,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.source == NutritionSource::NotFound
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
