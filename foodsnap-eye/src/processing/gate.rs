//! Confidence gate

/// Outcome of gating one classifier score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Accept,
    Reject,
}

impl GateDecision {
    pub fn is_accepted(self) -> bool {
        self == GateDecision::Accept
    }
}

/// Accepts a score when it reaches the threshold
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceGate;

impl ConfidenceGate {
    pub fn gate(score: f32, threshold: f32) -> GateDecision {
        if score.is_finite() && score >= threshold {
            GateDecision::Accept
        } else {
            GateDecision::Reject
        }
    }
}
