//! foodsnap-nutrition: nutrition lookup for recognised foods
//!
//! Queries an ordered chain of external providers (Edamam, USDA FoodData
//! Central, Spoonacular, Open Food Facts) and normalizes the first usable
//! answer into a [`foodsnap_core::NutritionRecord`]. Resolution never fails;
//! when every provider comes up empty the record is tagged "Not Found".

pub mod cache;
pub mod config;
pub mod error;
pub mod providers;
pub mod resolver;

#[cfg(test)]
mod resolver_tests;

pub use cache::NutritionCache;
pub use config::{NutritionConfig, ProviderEndpoints, ProviderKind};
pub use error::{NutritionError, Result};
pub use providers::NutritionProvider;
pub use resolver::NutritionResolver;
