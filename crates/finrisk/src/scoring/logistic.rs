use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{check_arity, Inference, InferenceError, LoadError, ScoringModel, FEATURE_COUNT};

/// Reference artifact shipped with the crate.
pub const EMBEDDED_ARTIFACT: &[u8] = include_bytes!("../../models/finrisk_classifier.json");

/// Where the artifact bytes come from.
#[derive(Debug, Clone)]
pub enum ModelSource {
    File(PathBuf),
    Embedded(&'static [u8]),
}

impl ModelSource {
    fn read(&self) -> Result<Vec<u8>, LoadError> {
        match self {
            ModelSource::File(path) => fs::read(path).map_err(|source| {
                if source.kind() == ErrorKind::NotFound {
                    LoadError::Missing { path: path.clone() }
                } else {
                    LoadError::Unreadable {
                        path: path.clone(),
                        source,
                    }
                }
            }),
            ModelSource::Embedded(bytes) => Ok(bytes.to_vec()),
        }
    }
}

/// Serialized single-layer logistic classifier plus its tensor metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_name: String,
    pub model_version: String,
    pub input_shape: Vec<usize>,
    #[serde(default)]
    pub input_names: Vec<String>,
    pub output_shape: Vec<usize>,
    #[serde(default)]
    pub output_name: Option<String>,
    pub weights: Vec<f32>,
    pub bias: f32,
}

impl ModelArtifact {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, LoadError> {
        let artifact: Self = serde_json::from_slice(bytes)?;
        artifact.validate()?;
        Ok(artifact)
    }

    fn validate(&self) -> Result<(), LoadError> {
        if self.input_shape != [1, FEATURE_COUNT] {
            return Err(LoadError::Invalid(format!(
                "input tensor shape {:?}, expected [1, {FEATURE_COUNT}]",
                self.input_shape
            )));
        }
        if self.output_shape != [1, 1] {
            return Err(LoadError::Invalid(format!(
                "output tensor shape {:?}, expected [1, 1]",
                self.output_shape
            )));
        }
        if self.weights.len() != FEATURE_COUNT {
            return Err(LoadError::Invalid(format!(
                "{} weights declared for {FEATURE_COUNT} inputs",
                self.weights.len()
            )));
        }
        if !self.input_names.is_empty() && self.input_names.len() != FEATURE_COUNT {
            return Err(LoadError::Invalid(format!(
                "{} input names declared for {FEATURE_COUNT} inputs",
                self.input_names.len()
            )));
        }
        if self.weights.iter().chain([&self.bias]).any(|v| !v.is_finite()) {
            return Err(LoadError::Invalid(
                "weights and bias must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Parameters {
    weights: [f32; FEATURE_COUNT],
    bias: f32,
}

impl Parameters {
    fn score(&self, features: &[f32; FEATURE_COUNT]) -> f32 {
        let z = self
            .weights
            .iter()
            .zip(features)
            .fold(self.bias, |acc, (w, x)| acc + w * x);
        1.0 / (1.0 + (-z).exp())
    }
}

/// On-device backend evaluating `sigmoid(w·x + b)`.
///
/// Inference takes a read lock, so concurrent callers proceed in parallel;
/// `load` and `release` take the write lock and wait for in-flight calls.
#[derive(Debug)]
pub struct LogisticModel {
    source: ModelSource,
    parameters: RwLock<Option<Parameters>>,
}

impl LogisticModel {
    pub fn new(source: ModelSource) -> Self {
        Self {
            source,
            parameters: RwLock::new(None),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(ModelSource::File(path.into()))
    }

    pub fn embedded() -> Self {
        Self::new(ModelSource::Embedded(EMBEDDED_ARTIFACT))
    }

    /// Read and validate the artifact without loading it.
    pub fn artifact(&self) -> Result<ModelArtifact, LoadError> {
        ModelArtifact::from_slice(&self.source.read()?)
    }

    pub fn is_loaded(&self) -> bool {
        self.parameters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl ScoringModel for LogisticModel {
    fn load(&self) -> Result<(), LoadError> {
        let artifact = self.artifact()?;
        let mut weights = [0.0; FEATURE_COUNT];
        weights.copy_from_slice(&artifact.weights);

        *self
            .parameters
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Parameters {
            weights,
            bias: artifact.bias,
        });

        info!(
            model = %artifact.model_name,
            version = %artifact.model_version,
            "scoring model loaded"
        );
        Ok(())
    }

    fn infer(&self, features: &[f32]) -> Result<Inference, InferenceError> {
        let features = check_arity(features)?;
        let guard = self
            .parameters
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let parameters = guard.as_ref().ok_or(InferenceError::NotLoaded)?;

        Inference::measure(|| {
            let probability = parameters.score(&features);
            if probability.is_nan() {
                return Err(InferenceError::Backend(format!(
                    "non-numeric output for features {features:?}"
                )));
            }
            Ok(probability)
        })
    }

    fn release(&self) {
        let released = self
            .parameters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            info!("scoring model released");
        } else {
            debug!("release requested with no model loaded");
        }
    }
}
