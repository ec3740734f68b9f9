//! foodsnap-eye: food recognition for FoodSnap
//!
//! Decodes an uploaded photo, optionally detects food regions, classifies
//! each region, gates the scores against a confidence threshold and folds the
//! outcomes into one prediction with a portion-size estimate.
//!
//! Without a trained model the pipeline runs a seedable mock classifier so
//! the rest of the system stays usable end-to-end.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod preprocess;
pub mod processing;

pub use config::{SizeThresholds, VisionConfig, DEFAULT_LABELS};
pub use error::VisionError;
pub use models::{ClassificationResult, Classifier, DetectionBox, Detector, MockClassifier, ModelManager};
pub use pipeline::InferencePipeline;
pub use preprocess::{ImagePreprocessor, InputSpec};
pub use processing::{ConfidenceGate, GateDecision, PredictionAggregator, SizeEstimator};
