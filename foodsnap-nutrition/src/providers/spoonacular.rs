use crate::error::{NutritionError, Result};
use crate::providers::trait_impl::NutritionProvider;
use crate::providers::{fetch_json, key_prefix, number};
use async_trait::async_trait;
use foodsnap_core::{NutritionRecord, NutritionSource};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Spoonacular nutrition guess by dish title
pub struct SpoonacularProvider {
    api_key: Option<String>,
    client: Client,
    base_url: String,
}

impl SpoonacularProvider {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            api_key,
            client,
            base_url: "https://api.spoonacular.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| NutritionError::MissingCredentials("Spoonacular".to_string()))
    }

    fn value<'a>(json: &'a Value, field: &str) -> Option<&'a Value> {
        json.get(field).and_then(|v| v.get("value")).filter(|v| !v.is_null())
    }

    /// A body without `calories.value` is no match
    fn map_response(json: &Value, query: &str) -> Option<NutritionRecord> {
        let calories = Self::value(json, "calories")?;

        Some(NutritionRecord::new(
            query,
            "1 serving",
            number(Some(calories)),
            number(Self::value(json, "protein")),
            number(Self::value(json, "carbs")),
            number(Self::value(json, "fat")),
            NutritionSource::Spoonacular,
        ))
    }
}

#[async_trait]
impl NutritionProvider for SpoonacularProvider {
    fn name(&self) -> &'static str {
        "spoonacular"
    }

    fn source(&self) -> NutritionSource {
        NutritionSource::Spoonacular
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn lookup(&self, food_name: &str) -> Result<Option<NutritionRecord>> {
        let api_key = self.api_key()?;
        debug!("Querying Spoonacular for {:?} with key {}...", food_name, key_prefix(api_key));

        let url = format!("{}/recipes/guessNutrition", self.base_url);
        let request = self
            .client
            .get(&url)
            .query(&[("apiKey", api_key), ("title", food_name)]);

        let json = fetch_json(request).await?;
        Ok(Self::map_response(&json, food_name))
    }
}
