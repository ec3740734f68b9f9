use crate::error::{NutritionError, Result};
use crate::providers::trait_impl::NutritionProvider;
use crate::providers::{fetch_json, first, key_prefix, number, text_or};
use async_trait::async_trait;
use foodsnap_core::{NutritionRecord, NutritionSource};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Edamam Food Database parser
pub struct EdamamProvider {
    app_id: Option<String>,
    app_key: Option<String>,
    client: Client,
    base_url: String,
}

impl EdamamProvider {
    pub fn new(client: Client, app_id: Option<String>, app_key: Option<String>) -> Self {
        Self {
            app_id,
            app_key,
            client,
            base_url: "https://api.edamam.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (&self.app_id, &self.app_key) {
            (Some(id), Some(key)) => Ok((id, key)),
            _ => Err(NutritionError::MissingCredentials("Edamam".to_string())),
        }
    }

    /// `parsed[0].food`, else `hints[0].food`
    fn map_response(json: &Value, query: &str) -> Option<NutritionRecord> {
        let food = first(json, "parsed")
            .or_else(|| first(json, "hints"))
            .and_then(|entry| entry.get("food"))?;
        let nutrients = food.get("nutrients").cloned().unwrap_or(Value::Null);

        Some(NutritionRecord::new(
            text_or(food, "label", query),
            "1 serving",
            number(nutrients.get("ENERC_KCAL")),
            number(nutrients.get("PROCNT")),
            number(nutrients.get("CHOCDF")),
            number(nutrients.get("FAT")),
            NutritionSource::Edamam,
        ))
    }
}

#[async_trait]
impl NutritionProvider for EdamamProvider {
    fn name(&self) -> &'static str {
        "edamam"
    }

    fn source(&self) -> NutritionSource {
        NutritionSource::Edamam
    }

    fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    async fn lookup(&self, food_name: &str) -> Result<Option<NutritionRecord>> {
        let (app_id, app_key) = self.credentials()?;
        debug!("Querying Edamam for {:?} with key {}...", food_name, key_prefix(app_key));

        let url = format!("{}/api/food-database/v2/parser", self.base_url);
        let request = self
            .client
            .get(&url)
            .query(&[("app_id", app_id), ("app_key", app_key), ("ingr", food_name)]);

        let json = fetch_json(request).await?;
        Ok(Self::map_response(&json, food_name))
    }
}
