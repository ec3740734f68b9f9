//! Configuration for foodsnap-eye

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Labels used when no label file accompanies the model
pub const DEFAULT_LABELS: &[&str] = &[
    "chapati",
    "paneer butter masala",
    "dal",
    "rice",
    "biryani",
    "samosa",
    "dosa",
    "idli",
    "curry",
    "naan",
];

/// Area-ratio cut points of the size estimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeThresholds {
    /// Ratios strictly above this are `large`
    pub large: f32,
    /// Ratios strictly above this (and not large) are `medium`
    pub medium: f32,
}

impl Default for SizeThresholds {
    fn default() -> Self {
        Self {
            large: 0.30,
            medium: 0.15,
        }
    }
}

/// Vision pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Minimum classifier score for a region to be accepted
    pub confidence_threshold: f32,
    /// Directory holding `classifier.onnx`, optional `detector.onnx` and
    /// `class_indices.json`. `None` runs the pipeline in mock mode.
    pub model_path: Option<PathBuf>,
    /// Detector boxes scoring below this are dropped before cropping
    pub detection_score_threshold: f32,
    /// Classifier input edge length
    pub classifier_input_size: u32,
    /// Detector input edge length
    pub detector_input_size: u32,
    /// Run the portion-size heuristic on accepted predictions
    pub estimate_size: bool,
    /// Size estimator cut points
    pub size_thresholds: SizeThresholds,
    /// Classify detected regions on the rayon pool
    pub parallel_regions: bool,
    /// Labels the mock classifier draws from
    pub mock_labels: Vec<String>,
    /// Inclusive confidence band of the mock classifier
    pub mock_confidence_band: (f32, f32),
    /// Seed for the mock classifier; `None` seeds from entropy
    pub mock_seed: Option<u64>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            model_path: None,
            detection_score_threshold: 0.25,
            classifier_input_size: 384,
            detector_input_size: 640,
            estimate_size: true,
            size_thresholds: SizeThresholds::default(),
            parallel_regions: false,
            mock_labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
            mock_confidence_band: (0.3, 0.95),
            mock_seed: None,
        }
    }
}

impl VisionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("Confidence threshold must be between 0.0 and 1.0".to_string());
        }

        if !(0.0..=1.0).contains(&self.detection_score_threshold) {
            return Err("Detection score threshold must be between 0.0 and 1.0".to_string());
        }

        if self.classifier_input_size == 0 || self.classifier_input_size > 4096 {
            return Err("Classifier input size must be between 1 and 4096".to_string());
        }

        if self.detector_input_size == 0 || self.detector_input_size > 4096 {
            return Err("Detector input size must be between 1 and 4096".to_string());
        }

        let SizeThresholds { large, medium } = self.size_thresholds;
        if !(0.0..=1.0).contains(&medium) || !(0.0..=1.0).contains(&large) || medium > large {
            return Err("Size thresholds must satisfy 0 <= medium <= large <= 1".to_string());
        }

        let (low, high) = self.mock_confidence_band;
        if !(0.0..=1.0).contains(&low) || !(0.0..=1.0).contains(&high) || low > high {
            return Err("Mock confidence band must satisfy 0 <= low <= high <= 1".to_string());
        }

        if self.mock_labels.is_empty() {
            return Err("Mock label set must not be empty".to_string());
        }

        Ok(())
    }
}
