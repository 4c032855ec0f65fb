//! Credit risk assessment core.
//!
//! Raw applicant inputs flow through [`assessment::normalize`], a
//! [`scoring::ScoringModel`] backend, and [`assessment::DecisionPolicy`];
//! [`assessment::AssessmentOrchestrator`] coordinates the cycle and publishes
//! immutable [`assessment::AssessmentState`] snapshots to observers.

pub mod assessment;
pub mod batch;
pub mod config;
pub mod error;
pub mod scoring;
pub mod telemetry;
