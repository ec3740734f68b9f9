//! Model artifact resolution with mock fallback

use crate::config::{VisionConfig, DEFAULT_LABELS};
use crate::error::{Result, VisionError};
use crate::models::{Classifier, Detector, MockClassifier};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Classifier artifact inside the model directory
pub const CLASSIFIER_FILE: &str = "classifier.onnx";
/// Optional detector artifact inside the model directory
pub const DETECTOR_FILE: &str = "detector.onnx";
/// Label file inside the model directory
pub const LABELS_FILE: &str = "class_indices.json";

/// Capabilities selected at startup
pub struct LoadedModels {
    pub classifier: Arc<dyn Classifier>,
    pub detector: Option<Arc<dyn Detector>>,
    /// `true` when no trained classifier could be loaded
    pub mock: bool,
}

impl std::fmt::Debug for LoadedModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModels")
            .field("classifier", &self.classifier.name())
            .field("detector", &self.detector.as_ref().map(|d| d.name().to_string()))
            .field("mock", &self.mock)
            .finish()
    }
}

/// Resolves the model directory into detector/classifier capabilities
pub struct ModelManager;

impl ModelManager {
    /// Load models described by `config`. Anything short of a usable
    /// classifier artifact falls back to the mock classifier.
    pub fn load(config: &VisionConfig) -> Result<LoadedModels> {
        match Self::classifier_path(config) {
            Ok(dir) => Self::load_trained(&dir, config),
            Err(reason) => {
                warn!("No trained model available ({}), running in mock mode", reason);
                Self::mock(config)
            }
        }
    }

    /// Mock capability set built from the config's mock settings
    pub fn mock(config: &VisionConfig) -> Result<LoadedModels> {
        let classifier = MockClassifier::new(
            config.mock_labels.clone(),
            config.mock_confidence_band,
            config.mock_seed,
        )?;
        Ok(LoadedModels {
            classifier: Arc::new(classifier),
            detector: None,
            mock: true,
        })
    }

    fn classifier_path(config: &VisionConfig) -> std::result::Result<PathBuf, String> {
        let dir = config
            .model_path
            .as_ref()
            .ok_or_else(|| "model path not configured".to_string())?;

        if !dir.is_dir() {
            return Err(format!("model directory {:?} not found", dir));
        }

        if !dir.join(CLASSIFIER_FILE).is_file() {
            return Err(format!("{} missing in {:?}", CLASSIFIER_FILE, dir));
        }

        Ok(dir.clone())
    }

    #[cfg(feature = "onnx")]
    fn load_trained(dir: &Path, config: &VisionConfig) -> Result<LoadedModels> {
        use crate::models::onnx::{OnnxClassifier, OnnxDetector};
        use crate::preprocess::InputSpec;

        let labels = Self::load_labels(&dir.join(LABELS_FILE))?;
        let classifier = OnnxClassifier::new(
            &dir.join(CLASSIFIER_FILE),
            labels,
            InputSpec::efficientnet(config.classifier_input_size),
        )?;

        let detector_path = dir.join(DETECTOR_FILE);
        let detector: Option<Arc<dyn Detector>> = if detector_path.is_file() {
            Some(Arc::new(OnnxDetector::new(
                &detector_path,
                InputSpec::yolo(config.detector_input_size),
            )?))
        } else {
            info!("No {} found, running classifier-only", DETECTOR_FILE);
            None
        };

        Ok(LoadedModels {
            classifier: Arc::new(classifier),
            detector,
            mock: false,
        })
    }

    #[cfg(not(feature = "onnx"))]
    fn load_trained(dir: &Path, config: &VisionConfig) -> Result<LoadedModels> {
        warn!(
            "Model artifacts found in {:?} but the onnx feature is disabled, running in mock mode",
            dir
        );
        Self::mock(config)
    }

    /// Read the label file. Accepts `{"0": "rice", ...}` or `["rice", ...]`;
    /// a missing file yields the default label set.
    pub fn load_labels(path: &Path) -> Result<Vec<String>> {
        if !path.is_file() {
            warn!("Label file {:?} not found, using default labels", path);
            return Ok(DEFAULT_LABELS.iter().map(|s| s.to_string()).collect());
        }

        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        let labels = Self::parse_labels(&value)?;

        if labels.is_empty() {
            return Err(VisionError::Model(format!("Label file {:?} is empty", path)));
        }

        info!("Loaded {} labels from {:?}", labels.len(), path);
        Ok(labels)
    }

    fn parse_labels(value: &Value) -> Result<Vec<String>> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| VisionError::Model(format!("Label {} is not a string", item)))
                })
                .collect(),
            Value::Object(map) => {
                let mut indexed = map
                    .iter()
                    .map(|(key, label)| {
                        let idx = key.trim().parse::<usize>().map_err(|_| {
                            VisionError::Model(format!("Label index {:?} is not a number", key))
                        })?;
                        let label = label.as_str().ok_or_else(|| {
                            VisionError::Model(format!("Label for index {} is not a string", idx))
                        })?;
                        Ok((idx, label.to_string()))
                    })
                    .collect::<Result<Vec<(usize, String)>>>()?;

                indexed.sort_by_key(|(idx, _)| *idx);
                for (expected, (idx, _)) in indexed.iter().enumerate() {
                    if *idx != expected {
                        return Err(VisionError::Model(format!("Label index {} missing", expected)));
                    }
                }

                Ok(indexed.into_iter().map(|(_, label)| label).collect())
            }
            _ => Err(VisionError::Model(
                "Label file must be a JSON object or array".to_string(),
            )),
        }
    }
}
