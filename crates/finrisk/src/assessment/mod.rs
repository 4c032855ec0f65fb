//! Normalization, decision policy, and the orchestrator that ties them to a
//! scoring backend.

mod domain;
mod normalizer;
mod orchestrator;
mod policy;

#[cfg(test)]
mod tests;

pub use domain::{
    AssessmentState, AssessmentStatus, ErrorInfo, ErrorKind, NormalizedFeatures, RawInputs,
};
pub use normalizer::{normalize, NormalizationBounds};
pub use orchestrator::{AssessmentOrchestrator, OrchestratorError};
pub use policy::{AssessmentResult, Decision, DecisionPolicy};
