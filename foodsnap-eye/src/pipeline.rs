//! Detect → crop → classify → gate → aggregate

use crate::config::VisionConfig;
use crate::error::{Result, VisionError};
use crate::models::{Classifier, DetectionBox, Detector, ModelManager};
use crate::preprocess::ImagePreprocessor;
use crate::processing::{ConfidenceGate, PredictionAggregator, SizeEstimator};
use foodsnap_core::{FoodSize, PredictionResult, RegionOutcome};
use image::RgbImage;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Region handed to the classifier
struct Region {
    image: RgbImage,
    detection_score: Option<f32>,
}

/// Inference pipeline over pluggable detector and classifier capabilities.
///
/// Shared read-only after construction; wrap in an `Arc` to use it from
/// several requests.
pub struct InferencePipeline {
    classifier: Arc<dyn Classifier>,
    detector: Option<Arc<dyn Detector>>,
    size_estimator: SizeEstimator,
    config: VisionConfig,
}

impl InferencePipeline {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        detector: Option<Arc<dyn Detector>>,
        config: VisionConfig,
    ) -> Self {
        Self {
            classifier,
            detector,
            size_estimator: SizeEstimator::new(config.size_thresholds),
            config,
        }
    }

    /// Build the pipeline from configuration, falling back to mock mode when
    /// no trained model is available
    pub fn from_config(config: VisionConfig) -> Result<Self> {
        config.validate().map_err(VisionError::Config)?;
        let models = ModelManager::load(&config)?;
        info!(
            "Inference pipeline ready (classifier: {}, detector: {}, mock: {})",
            models.classifier.name(),
            models.detector.as_ref().map(|d| d.name()).unwrap_or("none"),
            models.mock
        );
        Ok(Self::new(models.classifier, models.detector, config))
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    pub fn is_mock(&self) -> bool {
        self.classifier.is_mock()
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    /// Decode an upload and run inference on it
    pub fn predict(&self, bytes: &[u8], mime: &str) -> Result<PredictionResult> {
        let image = ImagePreprocessor::decode(bytes, mime)?;
        self.predict_image(&image)
    }

    /// Run inference on a decoded image
    pub fn predict_image(&self, image: &RgbImage) -> Result<PredictionResult> {
        let regions = self.regions(image);
        let region_count = regions.len();

        let outcomes: Vec<RegionOutcome> = if self.config.parallel_regions && region_count > 1 {
            regions
                .par_iter()
                .map(|region| self.classify_region(region))
                .collect::<Vec<_>>()
                .into_iter()
                .flatten()
                .collect()
        } else {
            regions
                .iter()
                .filter_map(|region| self.classify_region(region))
                .collect()
        };

        if outcomes.is_empty() {
            return Err(VisionError::Inference(format!(
                "Classification failed for all {} region(s)",
                region_count
            )));
        }

        let result = PredictionAggregator::aggregate(outcomes, || self.estimate_size(image))
            .with_mock(self.classifier.is_mock());

        debug!(
            "Prediction: {:?} (confidence {:.2}, unknown: {}, size: {})",
            result.items(),
            result.confidence(),
            result.is_unknown(),
            result.size()
        );
        Ok(result)
    }

    /// Detected crops, or the whole image when there is no detector, the
    /// detector fails, or it finds nothing above the score threshold
    fn regions(&self, image: &RgbImage) -> Vec<Region> {
        let full_image = || {
            vec![Region {
                image: image.clone(),
                detection_score: None,
            }]
        };

        let detector = match &self.detector {
            Some(detector) => detector,
            None => return full_image(),
        };

        let boxes: Vec<DetectionBox> = match detector.detect(image) {
            Ok(boxes) => boxes,
            Err(e) => {
                warn!("Detector {} failed, classifying full image: {}", detector.name(), e);
                return full_image();
            }
        };

        let crops: Vec<Region> = boxes
            .iter()
            .filter(|b| b.detection_score >= self.config.detection_score_threshold)
            .filter_map(|b| {
                ImagePreprocessor::crop(image, b).map(|crop| Region {
                    image: crop,
                    detection_score: Some(b.detection_score),
                })
            })
            .collect();

        if crops.is_empty() {
            debug!("No usable detections among {} box(es), classifying full image", boxes.len());
            return full_image();
        }

        crops
    }

    fn classify_region(&self, region: &Region) -> Option<RegionOutcome> {
        match self.classifier.classify(&region.image) {
            Ok(classification) => {
                let accepted =
                    ConfidenceGate::gate(classification.score, self.config.confidence_threshold)
                        .is_accepted();
                Some(RegionOutcome {
                    label: classification.label,
                    score: classification.score,
                    detection_score: region.detection_score,
                    accepted,
                    top_k: classification.top_k,
                })
            }
            Err(e) => {
                warn!("Skipping region after classification failure: {}", e);
                None
            }
        }
    }

    fn estimate_size(&self, image: &RgbImage) -> FoodSize {
        if self.config.estimate_size {
            self.size_estimator.estimate(image)
        } else {
            FoodSize::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassificationResult;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Returns queued results in call order
    struct ScriptedClassifier {
        script: Mutex<VecDeque<Result<ClassificationResult>>>,
    }

    impl ScriptedClassifier {
        fn new(script: Vec<Result<ClassificationResult>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    impl Classifier for ScriptedClassifier {
        fn name(&self) -> &str {
            "scripted"
        }

        fn classify(&self, _image: &RgbImage) -> Result<ClassificationResult> {
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(VisionError::Inference("script exhausted".to_string())))
        }
    }

    struct FixedDetector(Vec<DetectionBox>);

    impl Detector for FixedDetector {
        fn name(&self) -> &str {
            "fixed"
        }

        fn detect(&self, _image: &RgbImage) -> Result<Vec<DetectionBox>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenDetector;

    impl Detector for BrokenDetector {
        fn name(&self) -> &str {
            "broken"
        }

        fn detect(&self, _image: &RgbImage) -> Result<Vec<DetectionBox>> {
            Err(VisionError::Inference("boom".to_string()))
        }
    }

    fn config(threshold: f32) -> VisionConfig {
        VisionConfig {
            confidence_threshold: threshold,
            ..VisionConfig::default()
        }
    }

    fn ok(label: &str, score: f32) -> Result<ClassificationResult> {
        Ok(ClassificationResult::new(label, score))
    }

    fn image() -> RgbImage {
        RgbImage::new(100, 100)
    }

    #[test]
    fn test_two_boxes_one_rejected() {
        let pipeline = InferencePipeline::new(
            Arc::new(ScriptedClassifier::new(vec![ok("rice", 0.9), ok("dal", 0.4)])),
            Some(Arc::new(FixedDetector(vec![
                DetectionBox::new(0.0, 0.0, 50.0, 50.0, 0.8),
                DetectionBox::new(50.0, 50.0, 100.0, 100.0, 0.7),
            ]))),
            config(0.6),
        );

        let result = pipeline.predict_image(&image()).unwrap();
        assert_eq!(result.items(), &["rice".to_string()]);
        assert!((result.confidence() - 0.9).abs() < 1e-6);
        assert!(!result.is_unknown());
        assert_eq!(result.regions().len(), 2);
        assert_eq!(result.regions()[1].detection_score, Some(0.7));
    }

    #[test]
    fn test_region_keeps_classifier_candidates() {
        let names: Vec<String> = ["rice", "biryani", "dal"].iter().map(|s| s.to_string()).collect();
        let distribution =
            ClassificationResult::from_distribution(&[0.7, 0.2, 0.1], &names, crate::models::TOP_K)
                .unwrap();
        let pipeline = InferencePipeline::new(
            Arc::new(ScriptedClassifier::new(vec![Ok(distribution)])),
            None,
            config(0.6),
        );

        let result = pipeline.predict_image(&image()).unwrap();
        assert_eq!(result.items(), &["rice".to_string()]);
        let candidates: Vec<&str> = result.regions()[0].top_k.iter().map(|c| c.class.as_str()).collect();
        assert_eq!(candidates, vec!["rice", "biryani", "dal"]);
        assert_eq!(result.regions()[0].top_k[1].score, 0.2);
    }

    #[test]
    fn test_zero_boxes_classifies_full_image() {
        let pipeline = InferencePipeline::new(
            Arc::new(ScriptedClassifier::new(vec![ok("dal", 0.82)])),
            Some(Arc::new(FixedDetector(Vec::new()))),
            config(0.6),
        );

        let result = pipeline.predict_image(&image()).unwrap();
        assert_eq!(result.items(), &["dal".to_string()]);
        assert_eq!(result.regions()[0].detection_score, None);
    }

    #[test]
    fn test_low_score_boxes_are_dropped() {
        let pipeline = InferencePipeline::new(
            Arc::new(ScriptedClassifier::new(vec![ok("naan", 0.7)])),
            Some(Arc::new(FixedDetector(vec![DetectionBox::new(0.0, 0.0, 50.0, 50.0, 0.1)]))),
            config(0.6),
        );

        let result = pipeline.predict_image(&image()).unwrap();
        assert_eq!(result.regions().len(), 1);
        assert_eq!(result.regions()[0].detection_score, None);
    }

    #[test]
    fn test_detector_failure_falls_back() {
        let pipeline = InferencePipeline::new(
            Arc::new(ScriptedClassifier::new(vec![ok("idli", 0.75)])),
            Some(Arc::new(BrokenDetector)),
            config(0.6),
        );

        let result = pipeline.predict_image(&image()).unwrap();
        assert_eq!(result.items(), &["idli".to_string()]);
    }

    #[test]
    fn test_failed_region_is_skipped() {
        let pipeline = InferencePipeline::new(
            Arc::new(ScriptedClassifier::new(vec![
                Err(VisionError::Inference("bad crop".to_string())),
                ok("dosa", 0.7),
            ])),
            Some(Arc::new(FixedDetector(vec![
                DetectionBox::new(0.0, 0.0, 50.0, 50.0, 0.8),
                DetectionBox::new(50.0, 50.0, 100.0, 100.0, 0.8),
            ]))),
            config(0.6),
        );

        let result = pipeline.predict_image(&image()).unwrap();
        assert_eq!(result.items(), &["dosa".to_string()]);
        assert_eq!(result.regions().len(), 1);
    }

    #[test]
    fn test_all_regions_failed_is_error() {
        let pipeline = InferencePipeline::new(
            Arc::new(ScriptedClassifier::new(Vec::new())),
            None,
            config(0.6),
        );

        assert!(matches!(
            pipeline.predict_image(&image()),
            Err(VisionError::Inference(_))
        ));
    }

    #[test]
    fn test_rejected_has_unknown_size() {
        let pipeline = InferencePipeline::new(
            Arc::new(ScriptedClassifier::new(vec![ok("rice", 0.45)])),
            None,
            config(0.6),
        );

        let result = pipeline.predict_image(&image()).unwrap();
        assert!(result.is_unknown());
        assert!((result.confidence() - 0.45).abs() < 1e-6);
        assert_eq!(result.size(), FoodSize::Unknown);
    }

    #[test]
    fn test_size_estimation_can_be_disabled() {
        let pipeline = InferencePipeline::new(
            Arc::new(ScriptedClassifier::new(vec![ok("rice", 0.9)])),
            None,
            VisionConfig {
                estimate_size: false,
                ..config(0.6)
            },
        );

        let result = pipeline.predict_image(&image()).unwrap();
        assert_eq!(result.size(), FoodSize::Unknown);
        assert!(!result.is_unknown());
    }

    #[test]
    fn test_parallel_regions_preserve_order() {
        struct ByWidth;

        impl Classifier for ByWidth {
            fn name(&self) -> &str {
                "by-width"
            }

            fn classify(&self, image: &RgbImage) -> Result<ClassificationResult> {
                Ok(ClassificationResult::new(format!("w{}", image.width()), 0.9))
            }
        }

        let boxes = (1..=8)
            .map(|i| DetectionBox::new(0.0, 0.0, (i * 10) as f32, 10.0, 0.9))
            .collect();
        let pipeline = InferencePipeline::new(
            Arc::new(ByWidth),
            Some(Arc::new(FixedDetector(boxes))),
            VisionConfig {
                parallel_regions: true,
                ..config(0.6)
            },
        );

        let result = pipeline.predict_image(&image()).unwrap();
        let expected: Vec<String> = (1..=8).map(|i| format!("w{}", i * 10)).collect();
        assert_eq!(result.items(), expected.as_slice());
    }

    #[test]
    fn test_from_config_without_model_is_mock() {
        let pipeline = InferencePipeline::from_config(VisionConfig {
            mock_seed: Some(3),
            ..VisionConfig::default()
        })
        .unwrap();
        assert!(pipeline.is_mock());
        assert!(!pipeline.has_detector());

        let result = pipeline.predict_image(&image()).unwrap();
        assert!(result.is_mock());
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let result = InferencePipeline::from_config(config(1.5));
        assert!(matches!(result, Err(VisionError::Config(_))));
    }
}
