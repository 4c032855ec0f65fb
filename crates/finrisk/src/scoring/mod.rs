//! Scoring backends behind a single load/infer/release contract.
//!
//! The orchestrator owns the only handle to a backend, so implementations only
//! need to tolerate concurrent `infer` calls from its worker tasks.

mod fixed;
mod logistic;

pub use fixed::FixedScoringModel;
pub use logistic::{LogisticModel, ModelArtifact, ModelSource, EMBEDDED_ARTIFACT};

use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Number of scalar inputs every backend accepts.
pub const FEATURE_COUNT: usize = 3;

/// Identifier of the reference model artifact.
pub const MODEL_ARTIFACT_NAME: &str = "finrisk_classifier";

/// Opaque scoring function from normalized features to an approval probability.
///
/// `release` must be idempotent and safe to call when `load` never succeeded.
pub trait ScoringModel: Send + Sync {
    fn load(&self) -> Result<(), LoadError>;
    fn infer(&self, features: &[f32]) -> Result<Inference, InferenceError>;
    fn release(&self);

    /// Label used in logs.
    fn name(&self) -> &str {
        MODEL_ARTIFACT_NAME
    }
}

/// Raw model output plus the wall-clock time the backend spent producing it.
///
/// The probability is *not* clamped here; consumers clamp before use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inference {
    pub probability: f32,
    pub latency: Duration,
}

impl Inference {
    /// Run `score` and time it with a monotonic clock.
    pub fn measure<F>(score: F) -> Result<Self, InferenceError>
    where
        F: FnOnce() -> Result<f32, InferenceError>,
    {
        let started = Instant::now();
        let probability = score()?;
        Ok(Self {
            probability,
            latency: started.elapsed(),
        })
    }
}

/// Reject feature vectors that do not carry exactly [`FEATURE_COUNT`] values.
pub fn check_arity(features: &[f32]) -> Result<[f32; FEATURE_COUNT], InferenceError> {
    <[f32; FEATURE_COUNT]>::try_from(features).map_err(|_| InferenceError::Validation {
        expected: FEATURE_COUNT,
        actual: features.len(),
    })
}

/// Failure to bring a model artifact into memory.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("model artifact not found at {}", .path.display())]
    Missing { path: PathBuf },
    #[error("unable to read model artifact {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model artifact is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("model artifact is structurally invalid: {0}")]
    Invalid(String),
}

/// Failure of a single `infer` call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("expected {expected} features, received {actual}")]
    Validation { expected: usize, actual: usize },
    #[error("model is not loaded")]
    NotLoaded,
    #[error("scoring backend fault: {0}")]
    Backend(String),
}
