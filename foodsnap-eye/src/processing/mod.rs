//! Post-inference processing: gating, portion size and aggregation

pub mod aggregator;
pub mod gate;
pub mod size;

pub use aggregator::PredictionAggregator;
pub use gate::{ConfidenceGate, GateDecision};
pub use size::SizeEstimator;
