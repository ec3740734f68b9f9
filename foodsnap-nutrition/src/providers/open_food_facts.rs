use crate::error::Result;
use crate::providers::trait_impl::NutritionProvider;
use crate::providers::{fetch_json, first, number, text_or};
use async_trait::async_trait;
use foodsnap_core::{NutritionRecord, NutritionSource};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Open Food Facts product search. Needs no credential, only a User-Agent.
pub struct OpenFoodFactsProvider {
    enabled: bool,
    user_agent: String,
    client: Client,
    base_url: String,
}

impl OpenFoodFactsProvider {
    pub fn new(client: Client, enabled: bool, user_agent: impl Into<String>) -> Self {
        Self {
            enabled,
            user_agent: user_agent.into(),
            client,
            base_url: "https://world.openfoodfacts.org".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn map_response(json: &Value, query: &str) -> Option<NutritionRecord> {
        let product = first(json, "products")?;
        let nutriments = product.get("nutriments");
        let field = |name: &str| nutriments.and_then(|n| n.get(name));

        Some(NutritionRecord::new(
            text_or(product, "product_name", query),
            "100g",
            number(field("energy-kcal_100g")),
            number(field("proteins_100g")),
            number(field("carbohydrates_100g")),
            number(field("fat_100g")),
            NutritionSource::OpenFoodFacts,
        ))
    }
}

#[async_trait]
impl NutritionProvider for OpenFoodFactsProvider {
    fn name(&self) -> &'static str {
        "open_food_facts"
    }

    fn source(&self) -> NutritionSource {
        NutritionSource::OpenFoodFacts
    }

    fn is_configured(&self) -> bool {
        self.enabled
    }

    async fn lookup(&self, food_name: &str) -> Result<Option<NutritionRecord>> {
        debug!("Querying Open Food Facts for {:?}", food_name);

        let url = format!("{}/cgi/search.pl", self.base_url);
        let request = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str())
            .query(&[
                ("search_terms", food_name),
                ("search_simple", "1"),
                ("action", "process"),
                ("json", "1"),
                ("page_size", "1"),
            ]);

        let json = fetch_json(request).await?;
        Ok(Self::map_response(&json, food_name))
    }
}
