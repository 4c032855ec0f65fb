use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{check_arity, Inference, InferenceError, LoadError, ScoringModel};

/// Deterministic backend that always answers with the same probability.
///
/// Useful for demos and for exercising orchestration without a real artifact.
#[derive(Debug)]
pub struct FixedScoringModel {
    probability: f32,
    loaded: AtomicBool,
    loads: AtomicUsize,
    releases: AtomicUsize,
}

impl FixedScoringModel {
    pub fn new(probability: f32) -> Self {
        Self {
            probability,
            loaded: AtomicBool::new(false),
            loads: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of `release` calls, including ones that found nothing loaded.
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl ScoringModel for FixedScoringModel {
    fn load(&self) -> Result<(), LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn infer(&self, features: &[f32]) -> Result<Inference, InferenceError> {
        check_arity(features)?;
        if !self.loaded.load(Ordering::SeqCst) {
            return Err(InferenceError::NotLoaded);
        }
        Inference::measure(|| Ok(self.probability))
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.loaded.store(false, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "fixed"
    }
}
