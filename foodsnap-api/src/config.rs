//! Application configuration

use crate::error::ApiError;
use foodsnap_eye::VisionConfig;
use foodsnap_nutrition::NutritionConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

pub const THRESHOLD_ENV_VAR: &str = "FOODSNAP_CONFIDENCE_THRESHOLD";
pub const MODEL_PATH_ENV_VAR: &str = "FOODSNAP_MODEL_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub vision: VisionConfig,
    pub nutrition: NutritionConfig,
}

impl AppConfig {
    /// Load from a JSON, TOML or YAML file. The extension picks the format;
    /// anything else is tried in that order.
    pub fn from_file(path: &Path) -> Result<Self, ApiError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("Failed to read {:?}: {}", path, e)))?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| ApiError::Config(format!("Invalid JSON config: {}", e))),
            Some("toml") => toml::from_str(&content)
                .map_err(|e| ApiError::Config(format!("Invalid TOML config: {}", e))),
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .map_err(|e| ApiError::Config(format!("Invalid YAML config: {}", e))),
            _ => content.parse(),
        }
    }

    /// Defaults overlaid with the environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay threshold, model path, provider timeout and provider
    /// credentials from the environment
    pub fn apply_env(&mut self) {
        if let Ok(value) = env::var(THRESHOLD_ENV_VAR) {
            match value.trim().parse::<f32>() {
                Ok(threshold) => self.vision.confidence_threshold = threshold,
                Err(_) => warn!("Ignoring invalid {}={:?}", THRESHOLD_ENV_VAR, value),
            }
        }

        if let Ok(value) = env::var(MODEL_PATH_ENV_VAR) {
            if !value.trim().is_empty() {
                self.vision.model_path = Some(PathBuf::from(value.trim()));
            }
        }

        self.nutrition.apply_env();
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        self.vision
            .validate()
            .map_err(|e| ApiError::Config(format!("vision: {}", e)))?;
        self.nutrition
            .validate()
            .map_err(|e| ApiError::Config(format!("nutrition: {}", e)))?;
        Ok(())
    }
}

impl FromStr for AppConfig {
    type Err = ApiError;

    /// Parse configuration text, trying JSON, then TOML, then YAML
    fn from_str(content: &str) -> Result<Self, Self::Err> {
        if let Ok(config) = serde_json::from_str::<AppConfig>(content) {
            return Ok(config);
        }

        if let Ok(config) = toml::from_str::<AppConfig>(content) {
            return Ok(config);
        }

        if let Ok(config) = serde_yaml::from_str::<AppConfig>(content) {
            return Ok(config);
        }

        Err(ApiError::Config("Unknown configuration format".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodsnap_nutrition::ProviderKind;
    use std::io::Write;
    use tempfile::Builder;

    fn write(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.vision.confidence_threshold, 0.6);
    }

    #[test]
    fn test_from_toml_file() {
        let file = write(
            ".toml",
            r#"
            [vision]
            confidence_threshold = 0.1
            mock_seed = 9

            [nutrition]
            provider_order = ["open_food_facts"]
            provider_timeout_secs = 3
            "#,
        );
        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.vision.confidence_threshold, 0.1);
        assert_eq!(config.vision.mock_seed, Some(9));
        assert_eq!(config.nutrition.provider_order, vec![ProviderKind::OpenFoodFacts]);
        assert_eq!(config.nutrition.provider_timeout_secs, 3);
    }

    #[test]
    fn test_from_yaml_file() {
        let file = write(
            ".yaml",
            "vision:\n  confidence_threshold: 0.8\n  estimate_size: false\n",
        );
        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.vision.confidence_threshold, 0.8);
        assert!(!config.vision.estimate_size);
    }

    #[test]
    fn test_from_str_detects_json() {
        let config: AppConfig = r#"{"vision": {"parallel_regions": true}}"#.parse().unwrap();
        assert!(config.vision.parallel_regions);
    }

    #[test]
    fn test_invalid_file() {
        let file = write(".json", "{ not json");
        assert!(matches!(AppConfig::from_file(file.path()), Err(ApiError::Config(_))));
        assert!(AppConfig::from_file(Path::new("/nonexistent/foodsnap.toml")).is_err());
    }

    #[test]
    fn test_validate_reports_section() {
        let mut config = AppConfig::default();
        config.vision.confidence_threshold = 2.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("vision"));
    }
}
