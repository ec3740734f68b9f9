use crate::error::NutritionError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Env var overriding the per-provider timeout
pub const TIMEOUT_ENV_VAR: &str = "FOODSNAP_PROVIDER_TIMEOUT_SECS";

/// Env var overriding the provider order, e.g. `usda,open_food_facts`
pub const ORDER_ENV_VAR: &str = "FOODSNAP_PROVIDER_ORDER";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Edamam,
    Usda,
    Spoonacular,
    OpenFoodFacts,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Edamam,
        ProviderKind::Usda,
        ProviderKind::Spoonacular,
        ProviderKind::OpenFoodFacts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Edamam => "edamam",
            ProviderKind::Usda => "usda",
            ProviderKind::Spoonacular => "spoonacular",
            ProviderKind::OpenFoodFacts => "open_food_facts",
        }
    }

    /// Credential env vars the provider reads; empty when none are needed
    pub fn env_var_names(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::Edamam => &["EDAMAM_APP_ID", "EDAMAM_APP_KEY"],
            ProviderKind::Usda => &["USDA_API_KEY"],
            ProviderKind::Spoonacular => &["SPOONACULAR_API_KEY"],
            ProviderKind::OpenFoodFacts => &[],
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = NutritionError;

    /// Accepts the snake_case name, dashes, and `OpenFoodFacts`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "edamam" => Ok(ProviderKind::Edamam),
            "usda" => Ok(ProviderKind::Usda),
            "spoonacular" => Ok(ProviderKind::Spoonacular),
            "open_food_facts" | "openfoodfacts" => Ok(ProviderKind::OpenFoodFacts),
            other => Err(NutritionError::Config(format!("Unknown provider {:?}", other))),
        }
    }
}

/// Base URLs of the provider APIs. Overridable for staging or tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEndpoints {
    pub edamam: String,
    pub usda: String,
    pub spoonacular: String,
    pub open_food_facts: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            edamam: "https://api.edamam.com".to_string(),
            usda: "https://api.nal.usda.gov".to_string(),
            spoonacular: "https://api.spoonacular.com".to_string(),
            open_food_facts: "https://world.openfoodfacts.org".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionConfig {
    #[serde(skip_serializing)]
    pub edamam_app_id: Option<String>,
    #[serde(skip_serializing)]
    pub edamam_app_key: Option<String>,
    #[serde(skip_serializing)]
    pub usda_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub spoonacular_api_key: Option<String>,
    pub open_food_facts_enabled: bool,
    pub provider_order: Vec<ProviderKind>,
    pub provider_timeout_secs: u64,
    pub user_agent: String,
    pub endpoints: ProviderEndpoints,
    pub enable_caching: bool,
    pub cache_capacity: usize,
    pub cache_ttl_seconds: u64,
    pub not_found_ttl_seconds: u64,
}

impl std::fmt::Debug for NutritionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("NutritionConfig")
            .field("edamam_app_id", &set(&self.edamam_app_id))
            .field("edamam_app_key", &set(&self.edamam_app_key))
            .field("usda_api_key", &set(&self.usda_api_key))
            .field("spoonacular_api_key", &set(&self.spoonacular_api_key))
            .field("open_food_facts_enabled", &self.open_food_facts_enabled)
            .field("provider_order", &self.provider_order)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("endpoints", &self.endpoints)
            .field("enable_caching", &self.enable_caching)
            .field("cache_capacity", &self.cache_capacity)
            .field("cache_ttl_seconds", &self.cache_ttl_seconds)
            .field("not_found_ttl_seconds", &self.not_found_ttl_seconds)
            .finish()
    }
}

impl Default for NutritionConfig {
    fn default() -> Self {
        Self {
            edamam_app_id: None,
            edamam_app_key: None,
            usda_api_key: None,
            spoonacular_api_key: None,
            open_food_facts_enabled: true,
            provider_order: ProviderKind::ALL.to_vec(),
            provider_timeout_secs: 5,
            user_agent: "FoodSnap/1.0".to_string(),
            endpoints: ProviderEndpoints::default(),
            enable_caching: false,
            cache_capacity: 1000,
            cache_ttl_seconds: 3600,
            not_found_ttl_seconds: 300,
        }
    }
}

impl NutritionConfig {
    /// Defaults overlaid with credentials and timeout from the environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay provider credentials and the timeout from the environment.
    /// Unset or empty variables leave the current value untouched.
    pub fn apply_env(&mut self) {
        let read = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(v) = read("EDAMAM_APP_ID") {
            self.edamam_app_id = Some(v);
        }
        if let Some(v) = read("EDAMAM_APP_KEY") {
            self.edamam_app_key = Some(v);
        }
        if let Some(v) = read("USDA_API_KEY") {
            self.usda_api_key = Some(v);
        }
        if let Some(v) = read("SPOONACULAR_API_KEY") {
            self.spoonacular_api_key = Some(v);
        }
        if let Some(v) = read(TIMEOUT_ENV_VAR) {
            match v.trim().parse::<u64>() {
                Ok(secs) => self.provider_timeout_secs = secs,
                Err(_) => warn!("Ignoring invalid {}={:?}", TIMEOUT_ENV_VAR, v),
            }
        }
        if let Some(v) = read(ORDER_ENV_VAR) {
            match parse_provider_order(&v) {
                Ok(order) => self.provider_order = order,
                Err(e) => warn!("Ignoring {}={:?}: {}", ORDER_ENV_VAR, v, e),
            }
        }
    }

    /// Env vars still needed to enable each provider of the chain that
    /// cannot be queried yet
    pub fn missing_credentials(&self) -> Vec<(ProviderKind, &'static [&'static str])> {
        self.provider_order
            .iter()
            .filter(|kind| !self.is_configured(**kind))
            .map(|kind| (*kind, kind.env_var_names()))
            .collect()
    }

    /// Whether the provider has what it needs to be queried
    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::Edamam => self.edamam_app_id.is_some() && self.edamam_app_key.is_some(),
            ProviderKind::Usda => self.usda_api_key.is_some(),
            ProviderKind::Spoonacular => self.spoonacular_api_key.is_some(),
            ProviderKind::OpenFoodFacts => self.open_food_facts_enabled,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.provider_timeout_secs == 0 || self.provider_timeout_secs > 120 {
            return Err("Provider timeout must be between 1 and 120 seconds".to_string());
        }

        if self.provider_order.is_empty() {
            return Err("Provider order must name at least one provider".to_string());
        }

        for (i, kind) in self.provider_order.iter().enumerate() {
            if self.provider_order[..i].contains(kind) {
                return Err(format!("Provider {} listed more than once", kind.as_str()));
            }
        }

        if self.user_agent.trim().is_empty() {
            return Err("User agent must not be empty".to_string());
        }

        if self.enable_caching && (self.cache_capacity == 0 || self.cache_capacity > 100_000) {
            return Err("Cache capacity must be between 1 and 100000".to_string());
        }

        Ok(())
    }
}

/// Comma separated provider names, in chain order
pub fn parse_provider_order(value: &str) -> Result<Vec<ProviderKind>, NutritionError> {
    value
        .split(',')
        .filter(|name| !name.trim().is_empty())
        .map(ProviderKind::from_str)
        .collect()
}
