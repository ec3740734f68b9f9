//! Detector and classifier capabilities

pub mod manager;
pub mod mock;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use manager::{LoadedModels, ModelManager};
pub use mock::MockClassifier;

use crate::error::Result;
use foodsnap_core::ClassScore;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Candidate region in source-image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub detection_score: f32,
}

impl DetectionBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, detection_score: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            detection_score,
        }
    }
}

/// Number of candidates kept from a class distribution
pub const TOP_K: usize = 5;

/// Classification of one image: the top class plus the best candidates of
/// the distribution it came from, highest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    pub score: f32,
    #[serde(default)]
    pub top_k: Vec<ClassScore>,
}

impl ClassificationResult {
    /// Single-candidate result
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        let label = label.into();
        Self {
            top_k: vec![ClassScore::new(label.clone(), score)],
            label,
            score,
        }
    }

    /// Reduce a probability distribution over `labels` to its `k` best
    /// finite entries. Ties keep the lower index; an index without a label
    /// is named by its number. `None` when nothing is finite.
    pub fn from_distribution(probs: &[f32], labels: &[String], k: usize) -> Option<Self> {
        let mut ranked: Vec<(usize, f32)> = probs
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k.max(1));

        let top_k: Vec<ClassScore> = ranked
            .into_iter()
            .map(|(idx, p)| {
                let class = labels.get(idx).cloned().unwrap_or_else(|| idx.to_string());
                ClassScore::new(class, p)
            })
            .collect();

        let best = top_k.first()?;
        Some(Self {
            label: best.class.clone(),
            score: best.score,
            top_k,
        })
    }
}

/// Produces candidate food regions
pub trait Detector: Send + Sync {
    fn name(&self) -> &str;

    fn detect(&self, image: &RgbImage) -> Result<Vec<DetectionBox>>;
}

/// Classifies an image (full frame or crop) over a fixed label set
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    fn classify(&self, image: &RgbImage) -> Result<ClassificationResult>;

    /// Synthetic classifiers report `true` so results can be flagged
    fn is_mock(&self) -> bool {
        false
    }
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return vec![0.0; logits.len()];
    }
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}
