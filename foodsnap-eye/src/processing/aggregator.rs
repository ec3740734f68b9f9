//! Combines per-region outcomes into one prediction

use foodsnap_core::{FoodSize, PredictionResult, RegionOutcome};

/// Folds region outcomes (in detection order) into a [`PredictionResult`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PredictionAggregator;

impl PredictionAggregator {
    /// Items are the distinct accepted labels in detection order and the
    /// confidence is the best accepted score. With nothing accepted the
    /// result is unknown and keeps the best rejected score (0 without
    /// regions). `size` is only evaluated for an accepted result.
    pub fn aggregate<F>(outcomes: Vec<RegionOutcome>, size: F) -> PredictionResult
    where
        F: FnOnce() -> FoodSize,
    {
        let mut items: Vec<String> = Vec::new();
        let mut best_accepted: Option<f32> = None;
        let mut best_any = 0.0f32;

        for outcome in &outcomes {
            if outcome.score.is_finite() {
                best_any = best_any.max(outcome.score);
            }
            if !outcome.accepted {
                continue;
            }
            best_accepted = Some(best_accepted.map_or(outcome.score, |b| b.max(outcome.score)));
            if !items.contains(&outcome.label) {
                items.push(outcome.label.clone());
            }
        }

        let result = match best_accepted {
            Some(confidence) if !items.is_empty() => {
                PredictionResult::accepted(items, confidence, size())
            }
            _ => PredictionResult::unknown(best_any),
        };

        result.with_regions(outcomes)
    }
}
