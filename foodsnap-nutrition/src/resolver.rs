use crate::cache::NutritionCache;
use crate::config::{NutritionConfig, ProviderKind};
use crate::error::{NutritionError, Result};
use crate::providers::{
    EdamamProvider, NutritionProvider, OpenFoodFactsProvider, SpoonacularProvider, UsdaProvider,
};
use foodsnap_core::{NutritionQuery, NutritionRecord};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Ordered provider chain. Resolution never fails: the first usable
/// record wins, otherwise a zeroed "Not Found" record is returned.
pub struct NutritionResolver {
    providers: Vec<Box<dyn NutritionProvider>>,
    timeout: Duration,
    cache: Option<NutritionCache>,
}

impl NutritionResolver {
    pub fn new(providers: Vec<Box<dyn NutritionProvider>>, timeout: Duration) -> Self {
        Self {
            providers,
            timeout,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: NutritionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the chain in `provider_order` with a shared HTTP client
    pub fn from_config(config: &NutritionConfig) -> Result<Self> {
        config.validate().map_err(NutritionError::Config)?;

        let timeout = Duration::from_secs(config.provider_timeout_secs);
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(timeout)
            .build()?;

        let endpoints = &config.endpoints;
        let providers: Vec<Box<dyn NutritionProvider>> = config
            .provider_order
            .iter()
            .map(|kind| -> Box<dyn NutritionProvider> {
                match kind {
                    ProviderKind::Edamam => Box::new(
                        EdamamProvider::new(
                            client.clone(),
                            config.edamam_app_id.clone(),
                            config.edamam_app_key.clone(),
                        )
                        .with_base_url(&endpoints.edamam),
                    ),
                    ProviderKind::Usda => Box::new(
                        UsdaProvider::new(client.clone(), config.usda_api_key.clone())
                            .with_base_url(&endpoints.usda),
                    ),
                    ProviderKind::Spoonacular => Box::new(
                        SpoonacularProvider::new(client.clone(), config.spoonacular_api_key.clone())
                            .with_base_url(&endpoints.spoonacular),
                    ),
                    ProviderKind::OpenFoodFacts => Box::new(
                        OpenFoodFactsProvider::new(
                            client.clone(),
                            config.open_food_facts_enabled,
                            config.user_agent.as_str(),
                        )
                        .with_base_url(&endpoints.open_food_facts),
                    ),
                }
            })
            .collect();

        let mut resolver = Self::new(providers, timeout);
        if config.enable_caching {
            resolver = resolver.with_cache(NutritionCache::new(
                config.cache_capacity,
                Duration::from_secs(config.cache_ttl_seconds),
                Duration::from_secs(config.not_found_ttl_seconds),
            ));
        }

        for (kind, vars) in config.missing_credentials() {
            if vars.is_empty() {
                info!("Provider {} is disabled", kind);
            } else {
                info!("Provider {} is skipped until {} are set", kind, vars.join(", "));
            }
        }

        info!(
            "Nutrition resolver ready with providers {:?} (configured: {:?})",
            resolver.provider_names(),
            resolver.configured_providers()
        );
        Ok(resolver)
    }

    /// Provider names in chain order
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Providers that will actually be queried
    pub fn configured_providers(&self) -> Vec<&'static str> {
        self.providers
            .iter()
            .filter(|p| p.is_configured())
            .map(|p| p.name())
            .collect()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve one food name
    pub async fn resolve(&self, food_name: &str) -> NutritionRecord {
        let query = NutritionQuery::new(food_name.trim());
        if query.is_blank() {
            debug!("Blank nutrition query, skipping providers");
            return NutritionRecord::not_found(query.food_name);
        }

        let key = query.normalized_key();
        if let Some(cache) = &self.cache {
            if let Some(mut record) = cache.get(&key) {
                debug!("Nutrition cache hit for {:?}", key);
                // Records that echo the query carry this caller's spelling
                if record.is_not_found() || NutritionQuery::new(record.food.as_str()).normalized_key() == key {
                    record.food = query.food_name;
                }
                return record;
            }
        }

        let record = match self.query_chain(&query.food_name).await {
            Some(record) => record,
            None => {
                info!("No provider had nutrition data for {:?}", query.food_name);
                NutritionRecord::not_found(query.food_name.as_str())
            }
        };

        if let Some(cache) = &self.cache {
            cache.insert(key, record.clone());
        }
        record
    }

    /// Resolve each name independently, preserving order
    pub async fn resolve_all(&self, food_names: &[String]) -> Vec<NutritionRecord> {
        let mut records = Vec::with_capacity(food_names.len());
        for name in food_names {
            records.push(self.resolve(name).await);
        }
        records
    }

    async fn query_chain(&self, food_name: &str) -> Option<NutritionRecord> {
        for provider in &self.providers {
            if !provider.is_configured() {
                debug!("Skipping unconfigured provider {}", provider.name());
                continue;
            }

            match tokio::time::timeout(self.timeout, provider.lookup(food_name)).await {
                Ok(Ok(Some(mut record))) => {
                    record.source = provider.source();
                    info!("Resolved {:?} via {}", food_name, provider.name());
                    return Some(record);
                }
                Ok(Ok(None)) => {
                    debug!("Provider {} had no match for {:?}", provider.name(), food_name);
                }
                Ok(Err(e)) => {
                    warn!("Provider {} failed for {:?}: {}", provider.name(), food_name, e);
                }
                Err(_) => {
                    let err = NutritionError::Timeout(provider.name().to_string());
                    warn!("{} after {:?}", err, self.timeout);
                }
            }
        }
        None
    }
}
