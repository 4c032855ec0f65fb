use serde::{Deserialize, Serialize};

use super::policy::AssessmentResult;
use crate::scoring::{InferenceError, LoadError, FEATURE_COUNT};

/// User-adjustable applicant attributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawInputs {
    /// Annual income in currency units.
    pub income: f64,
    /// Age in years.
    pub age: u32,
    /// App engagement score, expected within [0, 1].
    pub engagement: f64,
}

impl Default for RawInputs {
    fn default() -> Self {
        Self {
            income: 50_000.0,
            age: 30,
            engagement: 0.5,
        }
    }
}

/// Ordered model inputs: income, age, engagement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFeatures([f32; FEATURE_COUNT]);

impl NormalizedFeatures {
    pub fn new(values: [f32; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> [f32; FEATURE_COUNT] {
        self.0
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn income(&self) -> f32 {
        self.0[0]
    }

    pub fn age(&self) -> f32 {
        self.0[1]
    }

    pub fn engagement(&self) -> f32 {
        self.0[2]
    }
}

/// Failure category surfaced to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Load,
    Inference,
    Disposed,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Load => "load",
            Self::Inference => "inference",
            Self::Disposed => "disposed",
        }
    }
}

/// Published description of a failed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&LoadError> for ErrorInfo {
    fn from(err: &LoadError) -> Self {
        Self::new(ErrorKind::Load, err.to_string())
    }
}

impl From<&InferenceError> for ErrorInfo {
    fn from(err: &InferenceError) -> Self {
        let kind = match err {
            InferenceError::Validation { .. } => ErrorKind::Validation,
            InferenceError::NotLoaded | InferenceError::Backend(_) => ErrorKind::Inference,
        };
        Self::new(kind, err.to_string())
    }
}

/// Coarse phase derived from a snapshot.
///
/// A snapshot that has settled and seen no input change since reports
/// `Settled` or `Failed`, which carry the outcome. `Idle` is left for a
/// quiescent snapshot with no outcome at all, such as one disposed before
/// its first cycle settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    /// Not loading, no result and no error.
    Idle,
    /// A cycle for the current inputs is in flight.
    Assessing,
    /// The latest cycle published a result.
    Settled,
    /// The latest cycle failed; any earlier result is kept alongside.
    Failed,
}

/// Immutable snapshot published by the orchestrator on every transition.
///
/// `result` and `normalized_features` are always replaced together. A failed
/// cycle only sets `error`; the last successful result stays in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentState {
    pub inputs: RawInputs,
    pub result: Option<AssessmentResult>,
    pub normalized_features: Option<NormalizedFeatures>,
    pub is_loading: bool,
    pub error: Option<ErrorInfo>,
}

impl AssessmentState {
    pub(crate) fn initial(inputs: RawInputs) -> Self {
        Self {
            inputs,
            result: None,
            normalized_features: None,
            is_loading: true,
            error: None,
        }
    }

    pub fn status(&self) -> AssessmentStatus {
        if self.is_loading {
            AssessmentStatus::Assessing
        } else if self.error.is_some() {
            AssessmentStatus::Failed
        } else if self.result.is_some() {
            AssessmentStatus::Settled
        } else {
            AssessmentStatus::Idle
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(
            self.status(),
            AssessmentStatus::Settled | AssessmentStatus::Failed
        )
    }

    /// One-line description for console observers.
    pub fn summary(&self) -> String {
        let inputs = format!(
            "income {:.0}, age {}, engagement {:.2}",
            self.inputs.income, self.inputs.age, self.inputs.engagement
        );
        match self.status() {
            AssessmentStatus::Assessing => format!("assessing ({inputs})"),
            AssessmentStatus::Idle => format!("idle ({inputs})"),
            AssessmentStatus::Settled => match &self.result {
                Some(result) => format!(
                    "{} at probability {:.3} ({inputs}, {} µs)",
                    result.decision.label(),
                    result.probability,
                    result.inference_latency.as_micros()
                ),
                None => format!("settled ({inputs})"),
            },
            AssessmentStatus::Failed => match &self.error {
                Some(error) => format!(
                    "{} error: {} ({inputs})",
                    error.kind.label(),
                    error.message
                ),
                None => format!("failed ({inputs})"),
            },
        }
    }
}
