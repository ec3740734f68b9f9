//! Synthetic classifier used when no trained model is available

use crate::error::{Result, VisionError};
use crate::models::{ClassificationResult, Classifier};
use image::RgbImage;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Draws a label uniformly from a fixed set and a confidence uniformly from
/// a band, rounded to two decimals. Ignores the pixels.
pub struct MockClassifier {
    labels: Vec<String>,
    band: (f32, f32),
    rng: Mutex<StdRng>,
}

impl MockClassifier {
    pub fn new(labels: Vec<String>, band: (f32, f32), seed: Option<u64>) -> Result<Self> {
        if labels.is_empty() {
            return Err(VisionError::Config("Mock classifier needs at least one label".to_string()));
        }
        let (low, high) = band;
        if !(0.0..=1.0).contains(&low) || !(0.0..=1.0).contains(&high) || low > high {
            return Err(VisionError::Config(format!(
                "Invalid mock confidence band ({}, {})",
                low, high
            )));
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            labels,
            band,
            rng: Mutex::new(rng),
        })
    }
}

impl Classifier for MockClassifier {
    fn name(&self) -> &str {
        "mock"
    }

    fn classify(&self, _image: &RgbImage) -> Result<ClassificationResult> {
        let mut rng = self.rng.lock();
        let (low, high) = self.band;
        let raw: f32 = rng.gen_range(low..=high);
        let score = ((raw * 100.0).round() / 100.0).clamp(low, high);
        let label = self
            .labels
            .choose(&mut *rng)
            .cloned()
            .ok_or_else(|| VisionError::Inference("Mock label set is empty".to_string()))?;

        Ok(ClassificationResult::new(label, score))
    }

    fn is_mock(&self) -> bool {
        true
    }
}
