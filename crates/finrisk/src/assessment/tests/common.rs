use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::assessment::{normalize, AssessmentOrchestrator, NormalizationBounds, RawInputs};
use crate::config::AssessmentConfig;
use crate::scoring::{check_arity, Inference, InferenceError, LoadError, ScoringModel};

pub(super) type Reply = Result<f32, InferenceError>;

const GATE_TIMEOUT: Duration = Duration::from_secs(5);

pub(super) fn inputs(income: f64, age: u32, engagement: f64) -> RawInputs {
    RawInputs {
        income,
        age,
        engagement,
    }
}

pub(super) fn config_with(initial_inputs: RawInputs) -> AssessmentConfig {
    AssessmentConfig {
        bounds: NormalizationBounds::STANDARD,
        initial_inputs,
    }
}

pub(super) fn start(model: Arc<dyn ScoringModel>, initial: RawInputs) -> AssessmentOrchestrator {
    AssessmentOrchestrator::start(model, config_with(initial)).expect("orchestrator starts")
}

fn income_key(income: f64) -> u32 {
    normalize(&inputs(income, 30, 0.5), &NormalizationBounds::STANDARD)
        .income()
        .to_bits()
}

/// Backend whose answers for specific incomes are held back until the test
/// releases them; every other income is answered immediately.
pub(super) struct GatedModel {
    fallback: f32,
    gates: Mutex<HashMap<u32, Receiver<Reply>>>,
    releases: AtomicUsize,
}

impl GatedModel {
    pub(super) fn new(fallback: f32) -> Self {
        Self {
            fallback,
            gates: Mutex::new(HashMap::new()),
            releases: AtomicUsize::new(0),
        }
    }

    /// Hold the reply for `income` until a value is sent on the returned handle.
    pub(super) fn gate(&self, income: f64) -> Sender<Reply> {
        let (tx, rx) = mpsc::channel();
        self.gates
            .lock()
            .expect("gate mutex poisoned")
            .insert(income_key(income), rx);
        tx
    }

    /// Whether inference for `income` has picked up its gate.
    pub(super) fn is_waiting(&self, income: f64) -> bool {
        !self
            .gates
            .lock()
            .expect("gate mutex poisoned")
            .contains_key(&income_key(income))
    }

    pub(super) fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl ScoringModel for GatedModel {
    fn load(&self) -> Result<(), LoadError> {
        Ok(())
    }

    fn infer(&self, features: &[f32]) -> Result<Inference, InferenceError> {
        let features = check_arity(features)?;
        let gate = self
            .gates
            .lock()
            .expect("gate mutex poisoned")
            .remove(&features[0].to_bits());

        Inference::measure(|| match gate {
            Some(rx) => rx
                .recv_timeout(GATE_TIMEOUT)
                .unwrap_or_else(|_| Err(InferenceError::Backend("gate dropped".to_string()))),
            None => Ok(self.fallback),
        })
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Backend whose first `failures` loads fail with a structural error.
pub(super) struct FlakyLoadModel {
    failures: usize,
    probability: f32,
    loads: AtomicUsize,
    loaded: Mutex<bool>,
}

impl FlakyLoadModel {
    pub(super) fn new(failures: usize, probability: f32) -> Self {
        Self {
            failures,
            probability,
            loads: AtomicUsize::new(0),
            loaded: Mutex::new(false),
        }
    }

    pub(super) fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ScoringModel for FlakyLoadModel {
    fn load(&self) -> Result<(), LoadError> {
        let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(LoadError::Invalid("weights tensor truncated".to_string()));
        }
        *self.loaded.lock().expect("load mutex poisoned") = true;
        Ok(())
    }

    fn infer(&self, features: &[f32]) -> Result<Inference, InferenceError> {
        check_arity(features)?;
        if !*self.loaded.lock().expect("load mutex poisoned") {
            return Err(InferenceError::NotLoaded);
        }
        Inference::measure(|| Ok(self.probability))
    }

    fn release(&self) {
        *self.loaded.lock().expect("load mutex poisoned") = false;
    }
}

/// Backend whose `load` blocks until the test opens the returned gate.
pub(super) struct GatedLoadModel {
    gate: Mutex<Option<Receiver<()>>>,
    loaded: Mutex<bool>,
    releases: AtomicUsize,
}

impl GatedLoadModel {
    pub(super) fn new() -> (Self, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let model = Self {
            gate: Mutex::new(Some(rx)),
            loaded: Mutex::new(false),
            releases: AtomicUsize::new(0),
        };
        (model, tx)
    }

    pub(super) fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl ScoringModel for GatedLoadModel {
    fn load(&self) -> Result<(), LoadError> {
        let gate = self.gate.lock().expect("gate mutex poisoned").take();
        if let Some(rx) = gate {
            rx.recv_timeout(GATE_TIMEOUT)
                .map_err(|_| LoadError::Invalid("load gate dropped".to_string()))?;
        }
        *self.loaded.lock().expect("load mutex poisoned") = true;
        Ok(())
    }

    fn infer(&self, features: &[f32]) -> Result<Inference, InferenceError> {
        check_arity(features)?;
        if !*self.loaded.lock().expect("load mutex poisoned") {
            return Err(InferenceError::NotLoaded);
        }
        Inference::measure(|| Ok(0.5))
    }

    fn release(&self) {
        *self.loaded.lock().expect("load mutex poisoned") = false;
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Wait until `condition` holds, failing the test after the gate timeout.
pub(super) async fn eventually(condition: impl Fn() -> bool) {
    tokio::time::timeout(GATE_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition reached before timeout");
}
