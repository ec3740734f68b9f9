use crate::error::Result;
use async_trait::async_trait;
use foodsnap_core::{NutritionRecord, NutritionSource};

/// One nutrition data source in the resolution chain
#[async_trait]
pub trait NutritionProvider: Send + Sync {
    /// Short provider name used in logs
    fn name(&self) -> &'static str;

    /// Tag stamped on records this provider returns
    fn source(&self) -> NutritionSource;

    /// Whether credentials (or an enable flag) are present
    fn is_configured(&self) -> bool;

    /// Look up a food. `Ok(None)` means the provider answered without a
    /// usable match.
    async fn lookup(&self, food_name: &str) -> Result<Option<NutritionRecord>>;
}
