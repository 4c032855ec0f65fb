use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Business outcome for an assessed applicant, ordered by favorability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Rejected,
    Review,
    Approved,
}

impl Decision {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Review => "review",
            Self::Rejected => "rejected",
        }
    }
}

/// Outcome of one completed inference. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentResult {
    pub probability: f32,
    pub decision: Decision,
    pub inference_latency: Duration,
    pub assessed_at: DateTime<Utc>,
}

/// Fixed thresholds mapping an approval probability to a [`Decision`].
pub struct DecisionPolicy;

impl DecisionPolicy {
    pub const APPROVAL_THRESHOLD: f32 = 0.70;
    pub const REVIEW_THRESHOLD: f32 = 0.40;

    /// Lower bounds are inclusive, so boundary values land in the higher bucket.
    pub fn decide(probability: f32) -> Decision {
        if probability >= Self::APPROVAL_THRESHOLD {
            Decision::Approved
        } else if probability >= Self::REVIEW_THRESHOLD {
            Decision::Review
        } else {
            Decision::Rejected
        }
    }

    /// Clamp raw model output to [0, 1] (NaN counts as 0) and decide.
    pub fn from_probability(raw_probability: f32, latency: Duration) -> AssessmentResult {
        let probability = if raw_probability.is_nan() {
            0.0
        } else {
            raw_probability.clamp(0.0, 1.0)
        };

        AssessmentResult {
            probability,
            decision: Self::decide(probability),
            inference_latency: latency,
            assessed_at: Utc::now(),
        }
    }
}
