use crate::error::{NutritionError, Result};
use crate::providers::trait_impl::NutritionProvider;
use crate::providers::{fetch_json, first, key_prefix, number, text_or};
use async_trait::async_trait;
use foodsnap_core::{NutritionRecord, NutritionSource};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

const ENERGY_KCAL: u64 = 1008;
const PROTEIN: u64 = 1003;
const FAT: u64 = 1004;
const CARBOHYDRATE: u64 = 1005;

/// USDA FoodData Central search
pub struct UsdaProvider {
    api_key: Option<String>,
    client: Client,
    base_url: String,
}

impl UsdaProvider {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            api_key,
            client,
            base_url: "https://api.nal.usda.gov".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| NutritionError::MissingCredentials("USDA".to_string()))
    }

    fn nutrient(nutrients: &[Value], id: u64) -> f64 {
        nutrients
            .iter()
            .find(|n| n.get("nutrientId").and_then(Value::as_u64) == Some(id))
            .map(|n| number(n.get("value")))
            .unwrap_or(0.0)
    }

    /// `servingSize` + `servingSizeUnit` when present, else 100g
    fn serving(food: &Value) -> String {
        let size = food.get("servingSize").and_then(Value::as_f64);
        let unit = food
            .get("servingSizeUnit")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("");
        match size {
            Some(size) if size > 0.0 => format!("{}{}", size, unit),
            _ => "100g".to_string(),
        }
    }

    fn map_response(json: &Value, query: &str) -> Option<NutritionRecord> {
        let food = first(json, "foods")?;
        let nutrients = food
            .get("foodNutrients")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        Some(NutritionRecord::new(
            text_or(food, "description", query),
            Self::serving(food),
            Self::nutrient(nutrients, ENERGY_KCAL),
            Self::nutrient(nutrients, PROTEIN),
            Self::nutrient(nutrients, CARBOHYDRATE),
            Self::nutrient(nutrients, FAT),
            NutritionSource::Usda,
        ))
    }
}

#[async_trait]
impl NutritionProvider for UsdaProvider {
    fn name(&self) -> &'static str {
        "usda"
    }

    fn source(&self) -> NutritionSource {
        NutritionSource::Usda
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn lookup(&self, food_name: &str) -> Result<Option<NutritionRecord>> {
        let api_key = self.api_key()?;
        debug!("Querying USDA for {:?} with key {}...", food_name, key_prefix(api_key));

        let url = format!("{}/fdc/v1/foods/search", self.base_url);
        let request = self
            .client
            .get(&url)
            .query(&[("api_key", api_key), ("query", food_name), ("pageSize", "1")]);

        let json = fetch_json(request).await?;
        Ok(Self::map_response(&json, food_name))
    }
}
