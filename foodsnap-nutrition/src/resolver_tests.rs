use crate::cache::NutritionCache;
use crate::config::{NutritionConfig, ProviderKind};
use crate::error::{NutritionError, Result};
use crate::providers::NutritionProvider;
use crate::resolver::NutritionResolver;
use async_trait::async_trait;
use foodsnap_core::{NutritionRecord, NutritionSource, UNKNOWN_SERVING};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

enum Behavior {
    Hit(f64),
    Miss,
    Fail,
    Hang,
}

struct FakeProvider {
    name: &'static str,
    source: NutritionSource,
    configured: bool,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
}

impl FakeProvider {
    fn new(name: &'static str, source: NutritionSource, behavior: Behavior) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Self {
            name,
            source,
            configured: true,
            behavior,
            calls: calls.clone(),
        };
        (provider, calls)
    }

    fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }
}

#[async_trait]
impl NutritionProvider for FakeProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn source(&self) -> NutritionSource {
        self.source
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn lookup(&self, food_name: &str) -> Result<Option<NutritionRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Hit(calories) => Ok(Some(NutritionRecord::new(
                food_name,
                "1 serving",
                calories,
                4.0,
                30.0,
                2.0,
                self.source,
            ))),
            Behavior::Miss => Ok(None),
            Behavior::Fail => Err(NutritionError::Status {
                status: 500,
                body: "internal".to_string(),
            }),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(None)
            }
        }
    }
}

fn chain(providers: Vec<FakeProvider>) -> NutritionResolver {
    let boxed: Vec<Box<dyn NutritionProvider>> = providers
        .into_iter()
        .map(|p| Box::new(p) as Box<dyn NutritionProvider>)
        .collect();
    NutritionResolver::new(boxed, Duration::from_millis(100))
}

#[tokio::test]
async fn test_first_success_wins() {
    let (a, a_calls) = FakeProvider::new("a", NutritionSource::Edamam, Behavior::Miss);
    let (b, b_calls) = FakeProvider::new("b", NutritionSource::Usda, Behavior::Hit(130.0));
    let (c, c_calls) = FakeProvider::new("c", NutritionSource::Spoonacular, Behavior::Hit(999.0));

    let record = chain(vec![a, b, c]).resolve("rice").await;

    assert_eq!(record.source, NutritionSource::Usda);
    assert_eq!(record.calories, 130);
    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    assert_eq!(c_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unconfigured_providers_are_skipped() {
    let (a, a_calls) = FakeProvider::new("a", NutritionSource::Edamam, Behavior::Hit(1.0));
    let (b, b_calls) = FakeProvider::new("b", NutritionSource::OpenFoodFacts, Behavior::Hit(128.0));

    let record = chain(vec![a.unconfigured(), b]).resolve("dal").await;

    assert_eq!(record.source, NutritionSource::OpenFoodFacts);
    assert_eq!(a_calls.load(Ordering::SeqCst), 0);
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_errors_and_timeouts_advance_the_chain() {
    let (a, _) = FakeProvider::new("a", NutritionSource::Edamam, Behavior::Fail);
    let (b, b_calls) = FakeProvider::new("b", NutritionSource::Usda, Behavior::Hang);
    let (c, c_calls) = FakeProvider::new("c", NutritionSource::Spoonacular, Behavior::Hit(470.0));

    let started = std::time::Instant::now();
    let record = chain(vec![a, b, c]).resolve("biryani").await;

    assert_eq!(record.source, NutritionSource::Spoonacular);
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    assert_eq!(c_calls.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_exhausted_chain_is_not_found() {
    let (a, _) = FakeProvider::new("a", NutritionSource::Edamam, Behavior::Miss);
    let (b, _) = FakeProvider::new("b", NutritionSource::Usda, Behavior::Fail);

    let record = chain(vec![a, b]).resolve("mystery stew").await;

    assert!(record.is_not_found());
    assert_eq!(record.food, "mystery stew");
    assert_eq!(record.serving_size, UNKNOWN_SERVING);
    assert_eq!(record.calories, 0);
    assert_eq!(record.protein_g, 0.0);
}

#[tokio::test]
async fn test_empty_chain_is_not_found() {
    let record = chain(Vec::new()).resolve("rice").await;
    assert!(record.is_not_found());
}

#[tokio::test]
async fn test_blank_query_skips_providers() {
    let (a, a_calls) = FakeProvider::new("a", NutritionSource::Edamam, Behavior::Hit(1.0));
    let resolver = chain(vec![a]);

    assert!(resolver.resolve("").await.is_not_found());
    assert!(resolver.resolve("   ").await.is_not_found());
    assert_eq!(a_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_source_matches_provider() {
    // A provider cannot stamp another provider's tag on its record
    struct Mislabeled;

    #[async_trait]
    impl NutritionProvider for Mislabeled {
        fn name(&self) -> &'static str {
            "mislabeled"
        }
        fn source(&self) -> NutritionSource {
            NutritionSource::Spoonacular
        }
        fn is_configured(&self) -> bool {
            true
        }
        async fn lookup(&self, food_name: &str) -> Result<Option<NutritionRecord>> {
            Ok(Some(NutritionRecord::new(food_name, "1 serving", 10.0, 0.0, 0.0, 0.0, NutritionSource::Edamam)))
        }
    }

    let resolver = NutritionResolver::new(vec![Box::new(Mislabeled)], Duration::from_secs(1));
    assert_eq!(resolver.resolve("x").await.source, NutritionSource::Spoonacular);
}

#[tokio::test]
async fn test_cache_serves_repeat_lookups() {
    let (a, a_calls) = FakeProvider::new("a", NutritionSource::Usda, Behavior::Hit(130.0));
    let resolver = chain(vec![a]).with_cache(NutritionCache::new(
        16,
        Duration::from_secs(60),
        Duration::from_secs(60),
    ));

    let first = resolver.resolve("Rice").await;
    let second = resolver.resolve("  rice ").await;

    assert_eq!(first.calories, second.calories);
    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cache_hit_uses_current_spelling() {
    let (miss, miss_calls) = FakeProvider::new("a", NutritionSource::Usda, Behavior::Miss);
    let resolver = chain(vec![miss]).with_cache(NutritionCache::new(
        16,
        Duration::from_secs(60),
        Duration::from_secs(60),
    ));

    assert_eq!(resolver.resolve("Rice").await.food, "Rice");
    let second = resolver.resolve("rice").await;
    assert!(second.is_not_found());
    assert_eq!(second.food, "rice");
    assert_eq!(miss_calls.load(Ordering::SeqCst), 1);

    // echoed query names follow the caller too
    let (hit, _) = FakeProvider::new("b", NutritionSource::Spoonacular, Behavior::Hit(470.0));
    let resolver = chain(vec![hit]).with_cache(NutritionCache::new(
        16,
        Duration::from_secs(60),
        Duration::from_secs(60),
    ));
    resolver.resolve("Biryani").await;
    let cached = resolver.resolve("biryani").await;
    assert_eq!(cached.food, "biryani");
    assert_eq!(cached.calories, 470);
}

#[tokio::test]
async fn test_not_found_is_retried_after_short_ttl() {
    let (a, a_calls) = FakeProvider::new("a", NutritionSource::Usda, Behavior::Miss);
    let resolver = chain(vec![a]).with_cache(NutritionCache::new(
        16,
        Duration::from_secs(60),
        Duration::ZERO,
    ));

    resolver.resolve("mystery").await;
    resolver.resolve("mystery").await;
    assert_eq!(a_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_resolve_all_preserves_order() {
    let (a, _) = FakeProvider::new("a", NutritionSource::Usda, Behavior::Hit(100.0));
    let names = vec!["naan".to_string(), "dal".to_string()];

    let records = chain(vec![a]).resolve_all(&names).await;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].food, "naan");
    assert_eq!(records[1].food, "dal");
}

#[test]
fn test_from_config_follows_provider_order() {
    let config = NutritionConfig {
        usda_api_key: Some("usda-test-key".to_string()),
        provider_order: vec![ProviderKind::OpenFoodFacts, ProviderKind::Usda, ProviderKind::Edamam],
        ..NutritionConfig::default()
    };

    let resolver = NutritionResolver::from_config(&config).unwrap();
    assert_eq!(resolver.provider_names(), vec!["open_food_facts", "usda", "edamam"]);
    assert_eq!(resolver.configured_providers(), vec!["open_food_facts", "usda"]);
    assert_eq!(resolver.timeout(), Duration::from_secs(5));
}

#[test]
fn test_from_config_rejects_invalid() {
    let config = NutritionConfig {
        provider_timeout_secs: 0,
        ..NutritionConfig::default()
    };
    assert!(matches!(
        NutritionResolver::from_config(&config),
        Err(NutritionError::Config(_))
    ));
}
